use crate::LoadSummary;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub loading: bool,
    pub current_name: Option<String>,
    pub percent: u8,
    pub message: String,
    pub last_summary: Option<LoadSummary>,
    pub last_error: Option<String>,
    pub superseded_loads: u32,
}
