pub mod auth_service;
pub mod reconciler;
pub mod record_service;
pub mod report_service;

pub use auth_service::{AuthError, AuthService, AuthServiceImpl};
pub use reconciler::{reconcile, ReconcileError};
pub use record_service::{PersistenceFault, RecordError, RecordService, RecordServiceImpl};
pub use report_service::{weighted_price, ReportError, ReportService, ReportServiceImpl};
