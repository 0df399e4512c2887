//! Selection-query language
//!
//! One column per selection query, whitespace-separated; columns are
//! Cartesian-multiplied and folded through the intersection operator:
//!
//! ```text
//! intersectionQuery = selectionQuery (WS selectionQuery)*
//! selectionQuery    = primary? multiplyAttr* filterAttr*
//! primary           = "#" id | type
//! multiplyAttr      = "[" attrList "]"
//! filterAttr        = "(" attrList ")"
//! attrList          = attr ("," attr)*
//! attr              = "#" id | name ("=" value)?
//! ```

mod attrs;
mod eval;
mod parser;

pub use attrs::{match_attr, AttrKind, AttrValue};
pub use eval::{evaluate, subset_by_path, subset_by_query};
pub use parser::{parse, parse_path, Primary, QueryAttr, SelectionQuery};
