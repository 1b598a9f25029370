//! Line framing and event decoding for the babel control protocol.

use crate::error::ProtocolError;
use crate::event::Event;
use crate::keyword::{EventType, ObjectType, Param};
use bytes::{Buf, BytesMut};

/// Line the daemon sends to terminate a banner or a command's output.
pub const END_OF_BATCH: &str = "ok";

/// Result of decoding one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message<'a> {
    /// The daemon finished the current batch.
    EndOfBatch,
    /// An event line.
    Event(Event<'a>),
}

impl<'a> Message<'a> {
    pub fn is_end_of_batch(&self) -> bool {
        matches!(self, Message::EndOfBatch)
    }

    /// Returns the event, if this message carries one.
    pub fn event(&self) -> Option<&Event<'a>> {
        match self {
            Message::Event(event) => Some(event),
            Message::EndOfBatch => None,
        }
    }
}

/// Decodes one line (without its terminator) into a [`Message`].
///
/// Decoding never fails: unknown verbs and object types map to `Unknown`,
/// unknown parameters are dropped together with their value, and a trailing
/// keyword without a value is ignored. A parameter given twice keeps the last
/// value.
pub fn decode_event(line: &str) -> Message<'_> {
    if line == END_OF_BATCH {
        return Message::EndOfBatch;
    }

    let mut event = Event::default();
    let mut tokens = line.split(' ').filter(|token| !token.is_empty());

    let Some(verb) = tokens.next() else {
        return Message::Event(event);
    };
    event.event_type = EventType::from_keyword(verb);

    let Some(object_type) = tokens.next() else {
        return Message::Event(event);
    };
    event.object_type = ObjectType::from_keyword(object_type);

    let Some(object) = tokens.next() else {
        return Message::Event(event);
    };
    event.object = object;

    while let Some(keyword) = tokens.next() {
        let Some(value) = tokens.next() else {
            break;
        };
        if let Some(param) = Param::from_keyword(keyword) {
            event.set_param(param, value);
        }
    }

    Message::Event(event)
}

/// Decodes one raw line (without its terminator) into a [`Message`].
///
/// The sentinel is matched on bytes. A line that is not valid UTF-8 cannot
/// carry a trustworthy object or parameter, so it decodes to an empty
/// `Unknown` event instead of failing.
pub fn decode_line(line: &[u8]) -> Message<'_> {
    if line == END_OF_BATCH.as_bytes() {
        return Message::EndOfBatch;
    }
    match std::str::from_utf8(line) {
        Ok(line) => decode_event(line),
        Err(_) => Message::Event(Event::default()),
    }
}

/// Encodes outbound commands.
pub struct Encoder;

impl Encoder {
    /// Encodes a command as a newline-terminated line. The command text is
    /// passed through unchanged.
    pub fn encode_command(command: &str) -> BytesMut {
        let mut buf = BytesMut::with_capacity(command.len() + 1);
        buf.extend_from_slice(command.as_bytes());
        buf.extend_from_slice(b"\n");
        buf
    }
}

/// Located line inside the decoder buffer.
#[derive(Debug, Clone, Copy)]
struct LineSpan {
    /// Length of the line content, terminator excluded.
    len: usize,
    /// Bytes to discard once the line has been handed out.
    consumed: usize,
}

/// Splits a byte stream into lines.
///
/// Bytes are appended with [`extend`](Self::extend); [`find_line`](Self::find_line)
/// locates the next complete line, which stays readable through
/// [`current_line`](Self::current_line) until the decoder is touched again.
/// Anything after the terminator is kept for the following line.
pub struct LineDecoder {
    buffer: BytesMut,
    /// Prefix of `buffer` already searched for a terminator.
    scanned: usize,
    current: Option<LineSpan>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::with_capacity(4096)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            scanned: 0,
            current: None,
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.release();
        self.buffer.extend_from_slice(data);
    }

    /// Looks for the next complete line. Returns `true` if one was found; it
    /// is then available through [`current_line`](Self::current_line).
    pub fn find_line(&mut self) -> bool {
        self.release();

        let Some(pos) = self.buffer[self.scanned..]
            .iter()
            .position(|&b| b == b'\n')
        else {
            self.scanned = self.buffer.len();
            return false;
        };

        let end = self.scanned + pos;
        let len = if end > 0 && self.buffer[end - 1] == b'\r' {
            end - 1
        } else {
            end
        };

        self.current = Some(LineSpan {
            len,
            consumed: end + 1,
        });
        self.scanned = 0;
        true
    }

    /// Returns the raw bytes of the line located by the last successful
    /// [`find_line`](Self::find_line), or an empty slice if there is none.
    pub fn current_line(&self) -> &[u8] {
        match self.current {
            Some(span) => &self.buffer[..span.len],
            None => &[],
        }
    }

    /// Returns the next complete line, if one is buffered.
    pub fn next_line(&mut self) -> Option<&[u8]> {
        if self.find_line() {
            Some(self.current_line())
        } else {
            None
        }
    }

    /// Checks the buffer once the stream has ended. Leftover bytes mean the
    /// last line never received its terminator.
    pub fn finish(&mut self) -> Result<(), ProtocolError> {
        self.release();
        if self.buffer.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::TruncatedLine {
                len: self.buffer.len(),
            })
        }
    }

    /// Returns the number of bytes currently buffered, including a line that
    /// has been handed out but not yet released.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
        self.current = None;
    }

    fn release(&mut self) {
        if let Some(span) = self.current.take() {
            self.buffer.advance(span.consumed);
        }
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn next(decoder: &mut LineDecoder) -> Option<String> {
        decoder
            .next_line()
            .map(|line| String::from_utf8_lossy(line).into_owned())
    }

    fn collect_lines(decoder: &mut LineDecoder, out: &mut Vec<String>) {
        while let Some(line) = next(decoder) {
            out.push(line);
        }
    }

    fn event(line: &str) -> Event<'_> {
        match decode_event(line) {
            Message::Event(event) => event,
            Message::EndOfBatch => panic!("unexpected end of batch for {:?}", line),
        }
    }

    #[test]
    fn test_lines_in_one_chunk() {
        let mut decoder = LineDecoder::new();
        decoder.extend(b"BABEL 1.0\nversion babeld-1.13\nok\n");

        let mut lines = Vec::new();
        collect_lines(&mut decoder, &mut lines);
        assert_eq!(lines, vec!["BABEL 1.0", "version babeld-1.13", "ok"]);
        assert!(decoder.finish().is_ok());
    }

    #[test]
    fn test_partial_line_is_retained() {
        let mut decoder = LineDecoder::new();
        decoder.extend(b"add interface et");
        assert_eq!(next(&mut decoder).as_deref(), None);

        decoder.extend(b"h0 up true\nchange");
        assert_eq!(
            next(&mut decoder).as_deref(),
            Some("add interface eth0 up true")
        );
        assert_eq!(next(&mut decoder).as_deref(), None);
        assert_eq!(decoder.buffered(), "change".len());

        decoder.extend(b" route r1\n");
        assert_eq!(next(&mut decoder).as_deref(), Some("change route r1"));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_crlf_stripped() {
        let mut decoder = LineDecoder::new();
        decoder.extend(b"ok\r\n\r\nlast\n");
        assert_eq!(next(&mut decoder).as_deref(), Some("ok"));
        assert_eq!(next(&mut decoder).as_deref(), Some(""));
        assert_eq!(next(&mut decoder).as_deref(), Some("last"));
    }

    #[test]
    fn test_only_one_terminator_stripped() {
        let mut decoder = LineDecoder::new();
        decoder.extend(b"a\r\r\n");
        assert_eq!(next(&mut decoder).as_deref(), Some("a\r"));
    }

    #[test]
    fn test_long_line_grows_buffer() {
        let long = "x".repeat(100_000);
        let mut decoder = LineDecoder::with_capacity(16);
        for chunk in long.as_bytes().chunks(333) {
            decoder.extend(chunk);
            assert!(!decoder.find_line());
        }
        decoder.extend(b"\n");
        assert_eq!(next(&mut decoder), Some(long));
    }

    #[test]
    fn test_finish_with_partial_line() {
        let mut decoder = LineDecoder::new();
        decoder.extend(b"ok\nadd rou");
        assert_eq!(next(&mut decoder).as_deref(), Some("ok"));
        assert_eq!(next(&mut decoder).as_deref(), None);

        match decoder.finish() {
            Err(ProtocolError::TruncatedLine { len }) => assert_eq!(len, 7),
            other => panic!("expected truncated line, got {:?}", other),
        }
    }

    #[test]
    fn test_non_utf8_line_is_framed() {
        let mut decoder = LineDecoder::new();
        decoder.extend(b"\xff\xfe\nok\n");
        assert_eq!(decoder.next_line(), Some(&b"\xff\xfe"[..]));
        assert_eq!(decoder.next_line(), Some(&b"ok"[..]));
        assert_eq!(decoder.next_line(), None);
    }

    #[test]
    fn test_decode_line() {
        assert_eq!(decode_line(b"ok"), Message::EndOfBatch);
        assert!(!decode_line(b"ok\xff").is_end_of_batch());

        let Message::Event(event) = decode_line(b"add interface eth0 up true") else {
            panic!("expected an event");
        };
        assert_eq!(event.object, "eth0");
        assert_eq!(event.param(Param::Up), Some("true"));

        assert_eq!(
            decode_line(b"add interface \xff up true"),
            Message::Event(Event::default())
        );
    }

    #[test]
    fn test_clear() {
        let mut decoder = LineDecoder::default();
        decoder.extend(b"partial");
        assert!(!decoder.find_line());
        decoder.clear();
        assert_eq!(decoder.buffered(), 0);
        assert_eq!(decoder.current_line(), b"");
    }

    #[test]
    fn test_encode_command() {
        assert_eq!(&Encoder::encode_command("monitor")[..], b"monitor\n");
        assert_eq!(&Encoder::encode_command("")[..], b"\n");
    }

    #[test]
    fn test_end_of_batch_is_case_sensitive() {
        assert_eq!(decode_event("ok"), Message::EndOfBatch);
        assert!(!decode_event("Ok").is_end_of_batch());
        assert!(!decode_event("OK").is_end_of_batch());
        assert!(!decode_event("ok ").is_end_of_batch());
    }

    #[test]
    fn test_decode_full_neighbour() {
        let event = event(
            "change neighbour n1 address fe80::1 if eth0 reach ffff rxcost 96 txcost 256 cost 96",
        );
        assert_eq!(event.event_type, EventType::Change);
        assert_eq!(event.object_type, ObjectType::Neighbour);
        assert_eq!(event.object, "n1");
        assert_eq!(event.param(Param::Address), Some("fe80::1"));
        assert_eq!(event.param(Param::If), Some("eth0"));
        assert_eq!(event.param(Param::Reach), Some("ffff"));
        assert_eq!(event.param(Param::Rxcost), Some("96"));
        assert_eq!(event.param(Param::Txcost), Some("256"));
        assert_eq!(event.param(Param::Cost), Some("96"));
        assert_eq!(event.params().count(), 6);
    }

    #[test]
    fn test_decode_tolerates_unknown_params() {
        let event = event("add route r1 prefix 10.0.0.0/8 bogus token");
        assert_eq!(event.event_type, EventType::Add);
        assert_eq!(event.object_type, ObjectType::Route);
        assert_eq!(event.object, "r1");
        assert_eq!(event.param(Param::Prefix), Some("10.0.0.0/8"));
        assert_eq!(event.params().count(), 1);
    }

    #[test]
    fn test_unknown_keyword_skips_its_value() {
        // "metric" here is the value of "bogus", not a keyword
        let event = event("add route r1 bogus metric installed yes");
        assert_eq!(event.param(Param::Metric), None);
        assert_eq!(event.param(Param::Installed), Some("yes"));
    }

    #[test]
    fn test_dangling_keyword_ignored() {
        let event = event("add xroute x1 prefix ::/0 metric");
        assert_eq!(event.object_type, ObjectType::XRoute);
        assert_eq!(event.param(Param::Prefix), Some("::/0"));
        assert_eq!(event.param(Param::Metric), None);
    }

    #[test]
    fn test_decode_unknown_verb_and_object() {
        let event = event("weird thing x1");
        assert_eq!(event.event_type, EventType::Unknown);
        assert_eq!(event.object_type, ObjectType::Unknown);
        assert_eq!(event.object, "x1");
        assert_eq!(event.params().count(), 0);
    }

    #[test]
    fn test_decode_short_lines() {
        assert_eq!(event(""), Event::default());

        let only_verb = event("flush");
        assert_eq!(only_verb.event_type, EventType::Flush);
        assert_eq!(only_verb.object_type, ObjectType::Unknown);
        assert_eq!(only_verb.object, "");

        let no_object = event("flush interface");
        assert_eq!(no_object.object_type, ObjectType::Interface);
        assert_eq!(no_object.object, "");
    }

    #[test]
    fn test_repeated_param_last_wins() {
        let event = event("add route r1 metric 96 metric 128");
        assert_eq!(event.param(Param::Metric), Some("128"));
    }

    #[test]
    fn test_consecutive_spaces_collapse() {
        let event = event("add  interface   eth0 up  true");
        assert_eq!(event.object_type, ObjectType::Interface);
        assert_eq!(event.object, "eth0");
        assert_eq!(event.param(Param::Up), Some("true"));
    }

    #[test]
    fn test_decode_route_line() {
        let event = event(
            "add route 5624f0 prefix 2001:db8::/64 from ::/0 installed yes id 02:00:00:ff:fe:00:00:01 metric 96 refmetric 0 via fe80::2 if wg0",
        );
        assert_eq!(event.object, "5624f0");
        assert_eq!(event.param(Param::From), Some("::/0"));
        assert_eq!(event.param(Param::Id), Some("02:00:00:ff:fe:00:00:01"));
        assert_eq!(event.param(Param::Refmetric), Some("0"));
        assert_eq!(event.param(Param::Via), Some("fe80::2"));
        assert_eq!(event.param(Param::If), Some("wg0"));
        assert_eq!(event.params().count(), 8);
    }

    proptest! {
        #[test]
        fn prop_chunking_does_not_change_lines(
            lines in proptest::collection::vec("[a-z0-9:. ]{0,40}", 0..20),
            cuts in proptest::collection::vec(1usize..17, 0..64),
        ) {
            let mut stream = Vec::new();
            for line in &lines {
                stream.extend_from_slice(line.as_bytes());
                stream.push(b'\n');
            }

            let mut whole = LineDecoder::new();
            whole.extend(&stream);
            let mut expected = Vec::new();
            collect_lines(&mut whole, &mut expected);

            let mut chunked = LineDecoder::new();
            let mut actual = Vec::new();
            let mut rest = &stream[..];
            let mut cuts = cuts.into_iter().cycle();
            while !rest.is_empty() {
                let n = cuts.next().unwrap_or(1).min(rest.len());
                chunked.extend(&rest[..n]);
                collect_lines(&mut chunked, &mut actual);
                rest = &rest[n..];
            }

            prop_assert_eq!(&expected, &lines);
            prop_assert_eq!(actual, expected);
            prop_assert!(chunked.finish().is_ok());
        }

        #[test]
        fn prop_byte_at_a_time(lines in proptest::collection::vec("[ -~]{0,30}", 0..10)) {
            let stream: String = lines.iter().map(|l| format!("{}\r\n", l)).collect();

            let mut decoder = LineDecoder::new();
            let mut actual = Vec::new();
            for byte in stream.as_bytes() {
                decoder.extend(std::slice::from_ref(byte));
                collect_lines(&mut decoder, &mut actual);
            }

            prop_assert_eq!(actual, lines);
        }
    }
}
