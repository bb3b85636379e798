pub mod apportionment;
pub mod clock_service;
pub mod growth_service;
pub mod ledger_service;
pub mod reconcile_service;
pub mod report_service;
pub mod template_service;
