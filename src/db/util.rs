use std::fmt::Write;

#[derive(Debug, Clone)]
pub struct ColumnMapper {
  pub name: &'static str,
  pub column: String,
}

pub fn column(name: &'static str) -> ColumnMapper {
  ColumnMapper {
    name,
    column: name.to_string(),
  }
}

/// Column whose name collides with an SQL keyword.
pub fn quoted(name: &'static str) -> ColumnMapper {
  ColumnMapper {
    name,
    column: format!(r#""{}""#, name),
  }
}

/// Column list of one table, in the order `*_from_row` reads them back.
#[derive(Debug, Default, Clone)]
pub struct ColumnMappers {
  pub table_name: &'static str,
  pub columns: Vec<ColumnMapper>,
}

impl ColumnMappers {
  /// Comma separated column list, each prefixed with `alias.` when given.
  pub fn get_columns(&self, alias: Option<&str>) -> String {
    self.columns.iter().map(|col| {
      match alias {
        Some(alias) => format!("{}.{}", alias, col.column),
        None => col.column.clone(),
      }
    }).collect::<Vec<String>>().join(", ")
  }

  pub fn build_select_query(&self) -> String {
    format!("SELECT {} FROM {}", self.get_columns(None), self.table_name)
  }

  /// Insert every column except `skip` (usually the SERIAL id), returning
  /// the full row.
  pub fn build_insert_returning(&self, skip: &str) -> String {
    let mut buf = String::new();
    let mut idx = 0;
    let mut values = Vec::new();
    write!(buf, "INSERT INTO {}(", self.table_name).unwrap();
    for col in self.columns.iter().filter(|col| col.name != skip) {
      if idx > 0 {
        buf.push_str(", ");
      }
      idx += 1;
      values.push(format!("${}", idx));
      buf.push_str(&col.column);
    }
    write!(buf, ") VALUES({}) RETURNING {}", values.join(", "), self.get_columns(None)).unwrap();
    buf
  }
}
