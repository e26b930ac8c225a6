use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::calc::CalcError;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
}

impl AppState {
    pub fn conn(&self) -> Result<&Connection, CalcError> {
        self.db
            .as_ref()
            .ok_or_else(|| CalcError::new("no_workspace", "select a workspace first"))
    }

    pub fn conn_mut(&mut self) -> Result<&mut Connection, CalcError> {
        self.db
            .as_mut()
            .ok_or_else(|| CalcError::new("no_workspace", "select a workspace first"))
    }
}
