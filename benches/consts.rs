pub const DATA_LINE: &[u8] = b"data: Hello, world!\n";
pub const COMMENT_LINE: &[u8] = b": keep-alive\n";
pub const EVENT_LINE: &[u8] = b"event: update\n";
pub const ID_LINE: &[u8] = b"id: 42\n";
pub const EMPTY_LINE: &[u8] = b"\n";
pub const RETRY_LINE: &[u8] = b"retry: 10000\n";
pub const NO_SPACE_LINE: &[u8] = b"data:value\n";
pub const UNKNOWN_LINE: &[u8] = b"garbage without a prefix\n";
pub const CRLF_LINE: &[u8] = b"data: windows\r\n";

/// `data:` line with a payload of roughly `len` bytes, mixing ASCII and 4-byte code points
pub fn big_data_line(len: usize) -> Vec<u8> {
    let mut line = b"data: ".to_vec();
    let mut n = 0usize;
    while line.len() < len {
        if n % 37 == 0 {
            line.extend_from_slice("\u{1F431}".as_bytes());
        } else {
            line.push(b'a' + (n % 26) as u8);
        }
        n += 1;
    }
    line.push(b'\n');
    line
}

pub fn generate_one_of_each(n: usize) -> Vec<u8> {
    let frame = [DATA_LINE, COMMENT_LINE, EVENT_LINE, ID_LINE, EMPTY_LINE];
    let mut buf = Vec::<u8>::with_capacity(frame.iter().map(|l| l.len()).sum::<usize>() * n);

    for _ in 0..n {
        for line in frame {
            buf.extend_from_slice(line);
        }
    }
    buf
}

/// Token-by-token completion stream: small JSON payloads, one per frame
pub fn generate_completion_stream(n: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    for i in 0..n {
        buf.extend_from_slice(
            format!(
                "id: {i}\nevent: delta\ndata: {{\"index\":{i},\"delta\":{{\"content\":\"tok{i} \"}}}}\n\n"
            )
            .as_bytes(),
        );
    }
    buf.extend_from_slice(b"data: [DONE]\n\n");
    buf
}

/// Multi-line frames with keep-alives, CRLF terminators and the odd protocol violation
pub fn generate_mixed_stream(n: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(RETRY_LINE);
    for i in 0..n {
        buf.extend_from_slice(COMMENT_LINE);
        buf.extend_from_slice(format!("id:{i}\r\n").as_bytes());
        buf.extend_from_slice(DATA_LINE);
        buf.extend_from_slice(NO_SPACE_LINE);
        buf.extend_from_slice(CRLF_LINE);
        if i % 16 == 0 {
            buf.extend_from_slice(UNKNOWN_LINE);
        }
        buf.extend_from_slice(b"\r\n");
    }
    buf
}
