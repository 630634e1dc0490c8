//! Transaction import pipeline: timeframe gate, file decoding, category
//! resolution and batch commit.

pub use committer::{
    Backend, CancelToken, CommitState, CommitSummary, Committer, build_payload, check_rows,
};
pub use decoder::{
    ACCEPTED_EXTENSIONS, Decoder, DropSelection, DroppedFile, FileFormat, MAX_FILE_BYTES,
    filter_dropped,
};
pub use error::{
    BackendError, CommitError, DecodeError, ImportError, ReferenceFetchError, Result, RowFailure,
    RowProblem, ValidationError,
};
pub use money::{Amount, ParseAmountError};
pub use resolver::{
    CategoryCatalog, CategoryModel, CategoryOption, ReferenceSource, RefreshOutcome,
    RefreshTicket, Resolver, SharedResolver, assign, auto_resolve, fetch_catalog, unresolved,
};
pub use row::{CategoryRef, IncomeCategory, RowId, RowSet, UploadedRow};
pub use session::{FailedRow, StagingSession};
pub use template::{TEMPLATE_FILE_NAME, TEMPLATE_HEADERS, write_template};
pub use timeframe::{MIN_YEAR, Timeframe, TimeframeGate, is_upload_disabled};

mod committer;
mod decoder;
mod error;
mod money;
mod resolver;
mod row;
mod session;
mod template;
mod timeframe;
