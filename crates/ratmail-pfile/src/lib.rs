//! Paged text for the message pager: styled lines spilled to a backing
//! store, wrapped into screen rows and searchable by regex.

pub mod dump;
pub mod file;
pub mod line;
pub mod markup;
pub mod rows;
pub mod search;
pub mod style;
pub mod width;
pub mod wrap;

pub use file::{FileId, LineId, PagedFile};
pub use line::{LineMut, PagedLine};
pub use markup::{MarkupList, MarkupSpan};
pub use rows::{RowLookup, RowPos, count_virtual_rows, find_virtual_row, virtual_row_of};
pub use search::{SearchDirection, SearchError, SearchHit, SearchSummary, SimplePagerSearch};
pub use style::{BuiltinStyles, StyleHandle, StyleId, StyleLookup};
pub use width::{char_width, str_width, truncate_to_width};
pub use wrap::{Segment, WrapFlags, segment_range, wrap_text};
