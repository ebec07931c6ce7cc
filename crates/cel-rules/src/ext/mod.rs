//! Extension libraries registered by [`Env::with_standard_library`](crate::Env::with_standard_library).
//!
//! - [`string_extension`]: `contains`, `startsWith`, `endsWith`, `matches`
//! - [`list_extension`]: `sum`, `unique`, `min`, `max`
//! - [`optionals_extension`]: `hasValue`, `value`, `orValue`

mod lists_ext;
mod optionals_ext;
mod string_ext;

pub use lists_ext::list_extension;
pub use optionals_ext::optionals_extension;
pub use string_ext::string_extension;

use crate::types::FunctionDecl;

/// Every extension library.
pub fn all_extensions() -> Vec<FunctionDecl> {
    let mut funcs = string_extension();
    funcs.extend(list_extension());
    funcs.extend(optionals_extension());
    funcs
}
