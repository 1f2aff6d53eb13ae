//! Receipt scanning: vision extraction, the normalization pipeline, and the
//! save orchestration.
//!
//! A receipt flows through this module twice. The scan endpoint sends the
//! image to the vision model, sanitizes and normalizes the reply, and hands
//! it back for review. The save endpoint runs the user-edited payload
//! through the same item-level validation and persists it.

mod extract;
mod normalize;
mod persist;
mod save_endpoint;
mod scan_endpoint;

pub use extract::{VisionClient, sanitize_model_json};
pub use normalize::{
    DEFAULT_CATEGORY, NormalizedReceipt, normalize_items, normalize_receipt, parse_extraction,
};
pub use persist::{SavedReceipt, save_receipt};
pub use save_endpoint::save_receipt_endpoint;
pub use scan_endpoint::scan_receipt_endpoint;
