//! Field normalizers and the record validator.
//!
//! Every function here is pure and never fails the caller: text that cannot be
//! interpreted turns into `None` plus a `tracing` warning.

pub mod dates;
pub mod location;
pub mod salary;
pub mod text;
pub mod validate;
pub mod work_setting;

pub use dates::{parse_date, parse_posted_date, parse_timestamp};
pub use location::{parse_location, ParsedLocation};
pub use salary::{parse_salary, ParsedSalary};
pub use text::{html_to_text, normalize_job_type};
pub use validate::{validate_record, Loose, RecordDraft, ValidationError};
pub use work_setting::resolve_work_setting;

pub const CRATE_NAME: &str = "jobsift-normalize";
