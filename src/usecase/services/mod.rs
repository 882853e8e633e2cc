pub mod explorer_service;
pub mod report_service;
