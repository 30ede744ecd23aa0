use std::fmt;

/// QA test a dispatched cohort was analysed as.
///
/// The name doubles as the ledger sheet and the archive folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestKind {
    T2T3,
    Catphan,
    Acr,
    WinstonLutz,
    Normi13,
}

impl TestKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::T2T3 => "T2-T3",
            Self::Catphan => "Catphan",
            Self::Acr => "ACR",
            Self::WinstonLutz => "Winston-Lutz",
            Self::Normi13 => "Normi-13",
        }
    }

    pub fn report_folder(self) -> String {
        format!("{} reports", self.name())
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
