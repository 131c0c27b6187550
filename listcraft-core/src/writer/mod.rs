//! Output writing: the patched price list and the offer table

mod offers;
mod xlsx;

pub use offers::write_offers;
pub use xlsx::write_price_list;
