use bytes_utils::Str;

pub(crate) const LF: u8 = b'\n';
pub(crate) const CR: u8 = b'\r';

const BOM_CHAR: char = '\u{FEFF}';
const BOM_LEN: usize = BOM_CHAR.len_utf8();
// bom           = %xFEFF ; U+FEFF BYTE ORDER MARK
pub(crate) const BOM: &[u8; BOM_LEN] = &{
    let mut buf = [0u8; BOM_LEN];
    BOM_CHAR.encode_utf8(&mut buf);
    buf
};

pub(crate) const EMPTY_STR: Str = Str::from_static("");

// colon-space forms must be tried before the bare colon forms
pub(crate) const ID_SPACE: &[u8] = b"id: ";
pub(crate) const ID: &[u8] = b"id:";
pub(crate) const COMMENT_SPACE: &[u8] = b": ";
pub(crate) const COMMENT: &[u8] = b":";
pub(crate) const EVENT_SPACE: &[u8] = b"event: ";
pub(crate) const EVENT: &[u8] = b"event:";
pub(crate) const DATA_SPACE: &[u8] = b"data: ";
pub(crate) const DATA: &[u8] = b"data:";
pub(crate) const RETRY: &[u8] = b"retry:";

pub(crate) const EVENT_STREAM_MIME: &str = "text/event-stream";
pub(crate) const DEFAULT_USER_AGENT: &str = concat!("sseload/", env!("CARGO_PKG_VERSION"));
