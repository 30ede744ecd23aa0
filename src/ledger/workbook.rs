use super::CellValue;
use crate::error::LedgerError;
use std::path::{Path, PathBuf};
use umya_spreadsheet::{Spreadsheet, Worksheet};

/// An xlsx results file, one sheet per test kind, headers in row 1.
pub struct Workbook {
    path: PathBuf,
    book: Spreadsheet,
}

impl Workbook {
    pub fn create(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            book: umya_spreadsheet::new_file_empty_worksheet(),
        }
    }

    pub fn open(path: &Path) -> Result<Self, LedgerError> {
        let book = umya_spreadsheet::reader::xlsx::read(path).map_err(|err| LedgerError::Workbook {
            path: path.to_path_buf(),
            message: format!("failed to read ({err})"),
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            book,
        })
    }

    pub fn save(&self) -> Result<(), LedgerError> {
        umya_spreadsheet::writer::xlsx::write(&self.book, &self.path).map_err(|err| {
            LedgerError::Workbook {
                path: self.path.clone(),
                message: format!("failed to write ({err})"),
            }
        })
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.book.get_sheet_by_name(name).is_some()
    }

    pub fn add_sheet(&mut self, name: &str, headers: &[String]) -> Result<(), LedgerError> {
        let path = self.path.clone();
        let sheet = self
            .book
            .new_sheet(name)
            .map_err(|message| LedgerError::Workbook {
                path,
                message: format!("cannot add sheet {name}: {message}"),
            })?;
        write_header(sheet, headers);
        Ok(())
    }

    /// Every row of the sheet, header included, as displayed text.
    pub fn rows(&self, name: &str) -> Result<Vec<Vec<String>>, LedgerError> {
        let sheet = self.sheet(name)?;
        let width = sheet.get_highest_column();
        let rows = (1..=sheet.get_highest_row())
            .map(|row| {
                (1..=width)
                    .map(|col| {
                        sheet
                            .get_cell((col, row))
                            .map(|cell| cell.get_value().to_string())
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();
        Ok(rows)
    }

    pub fn header_width(&self, name: &str) -> Result<usize, LedgerError> {
        Ok(self.sheet(name)?.get_highest_column() as usize)
    }

    pub fn set_header(&mut self, name: &str, headers: &[String]) -> Result<(), LedgerError> {
        let sheet = self.sheet_mut(name)?;
        write_header(sheet, headers);
        Ok(())
    }

    pub fn append_row(&mut self, name: &str, values: &[CellValue]) -> Result<(), LedgerError> {
        let sheet = self.sheet_mut(name)?;
        let row = sheet.get_highest_row() + 1;
        for (col, value) in (1u32..).zip(values) {
            let cell = sheet.get_cell_mut((col, row));
            match value {
                CellValue::Text(text) => {
                    cell.set_value(text.clone());
                }
                CellValue::Number(number) => {
                    cell.set_value_number(*number);
                }
                CellValue::Bool(flag) => {
                    cell.set_value_bool(*flag);
                }
                CellValue::Empty => {}
            }
        }
        Ok(())
    }

    fn sheet(&self, name: &str) -> Result<&Worksheet, LedgerError> {
        self.book
            .get_sheet_by_name(name)
            .ok_or_else(|| missing_sheet(&self.path, name))
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut Worksheet, LedgerError> {
        let path = self.path.clone();
        self.book
            .get_sheet_by_name_mut(name)
            .ok_or_else(|| missing_sheet(&path, name))
    }
}

fn write_header(sheet: &mut Worksheet, headers: &[String]) {
    for (col, header) in (1u32..).zip(headers) {
        sheet.get_cell_mut((col, 1)).set_value(header.clone());
    }
}

fn missing_sheet(path: &Path, name: &str) -> LedgerError {
    LedgerError::Workbook {
        path: path.to_path_buf(),
        message: format!("sheet {name} not found"),
    }
}
