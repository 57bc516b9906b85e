pub mod footer;
pub mod header;
pub mod utils;

pub use footer::draw_footer;
pub use header::{draw_header, extract_domain};
pub use utils::{cell_text, infer_columns, record_id, truncate};
