mod euro_cents;
pub mod helpers;
pub mod op;
mod secret;

pub use euro_cents::{EuroCents, EuroCentsConversionError, EURO_CURRENCY_CODE};
pub use secret::Secret;
