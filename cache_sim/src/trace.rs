use std::{
    io::{self, BufRead},
    iter::FusedIterator,
};

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till1},
    character::complete::{hex_digit1, multispace0, multispace1},
    combinator::{eof, map_res, opt, peek},
    IResult,
};

use crate::{common::Addr, hierarchy::Op};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEntry {
    pub op: Op,
    pub addr: Addr,
}

impl TraceEntry {
    pub fn new(op: Op, addr: Addr) -> Self {
        Self { op, addr }
    }

    /// parses `<op> <hex address>`. tokens after the address are ignored.
    pub fn parse(line: &str) -> Option<Self> {
        entry(line).ok().map(|(_, e)| e)
    }
}

fn op(input: &str) -> IResult<&str, Op> {
    let (input, token) = take_till1(char::is_whitespace)(input)?;
    Ok((input, Op::from_token(token)))
}

fn hex_addr(input: &str) -> IResult<&str, Addr> {
    let (input, _) = opt(alt((tag("0x"), tag("0X"))))(input)?;
    let (input, v) = map_res(hex_digit1, |d| u32::from_str_radix(d, 16))(input)?;
    // the whole token has to be hex
    let (input, _) = peek(alt((eof, multispace1)))(input)?;
    Ok((input, Addr::new(v)))
}

fn entry(input: &str) -> IResult<&str, TraceEntry> {
    let (input, _) = multispace0(input)?;
    let (input, op) = op(input)?;
    let (input, _) = multispace1(input)?;
    let (input, addr) = hex_addr(input)?;
    Ok((input, TraceEntry::new(op, addr)))
}

/// Reads trace entries line by line. Stops for good at the first line that
/// is empty, not UTF-8, or does not parse. Only failures of the underlying
/// reader come out as `Err`.
pub struct TraceReader<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
    done: bool,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_no: 0,
            done: false,
        }
    }
    /// number of lines consumed so far
    pub fn line_no(&self) -> usize {
        self.line_no
    }
    fn end_at(&mut self, line: &str) {
        self.done = true;
        log::info!(
            "trace ends at line {}: {:?} is not `<R|W> <hex address>`",
            self.line_no,
            line
        );
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = io::Result<TraceEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => {
                self.done = true;
                return None;
            }
            Ok(_) => {}
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        }
        self.line_no += 1;
        let entry = match std::str::from_utf8(&self.buf) {
            Ok(line) => TraceEntry::parse(line).ok_or_else(|| line.to_string()),
            Err(_) => Err(String::from_utf8_lossy(&self.buf).into_owned()),
        };
        match entry {
            Ok(entry) => Some(Ok(entry)),
            Err(line) => {
                self.end_at(line.trim_end_matches(&['\r', '\n'][..]));
                None
            }
        }
    }
}

impl<R: BufRead> FusedIterator for TraceReader<R> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(op: Op, v: u32) -> Option<TraceEntry> {
        Some(TraceEntry::new(op, Addr::new(v)))
    }

    #[test]
    fn test_parse_entry() {
        assert_eq!(TraceEntry::parse("R 0x1f"), read(Op::Read, 0x1f));
        assert_eq!(TraceEntry::parse("W 1F"), read(Op::Write, 0x1f));
        assert_eq!(TraceEntry::parse("  R\t0XdeadBEEF  "), read(Op::Read, 0xdead_beef));
        assert_eq!(TraceEntry::parse("R 0x400 trailing"), read(Op::Read, 0x400));
        assert_eq!(TraceEntry::parse("R 0x10\r"), read(Op::Read, 0x10));
        assert_eq!(TraceEntry::parse("R 0"), read(Op::Read, 0));
        assert_eq!(TraceEntry::parse("R 000000000ffffffff"), read(Op::Read, u32::MAX));
    }
    #[test]
    fn test_other_ops_write() {
        assert_eq!(TraceEntry::parse("r 0x10"), read(Op::Write, 0x10));
        assert_eq!(TraceEntry::parse("X 0x10"), read(Op::Write, 0x10));
    }
    #[test]
    fn test_parse_malformed() {
        assert_eq!(TraceEntry::parse(""), None);
        assert_eq!(TraceEntry::parse("   "), None);
        assert_eq!(TraceEntry::parse("R"), None);
        assert_eq!(TraceEntry::parse("R 0x"), None);
        assert_eq!(TraceEntry::parse("R 0xzz"), None);
        assert_eq!(TraceEntry::parse("R 12zz"), None);
        assert_eq!(TraceEntry::parse("R 0x100000000"), None);
    }
    #[test]
    fn test_reader_stops_at_malformed() {
        let trace = "R 0x0\nW 0x10\n\nR 0x20\n";
        let mut r = TraceReader::new(trace.as_bytes());
        let got: Vec<_> = r.by_ref().map(|e| e.unwrap()).collect();
        assert_eq!(got.len(), 2);
        assert_eq!(got[1], TraceEntry::new(Op::Write, Addr::new(0x10)));
        assert_eq!(r.line_no(), 3);
        assert!(r.next().is_none());
    }
    #[test]
    fn test_reader_stops_at_invalid_utf8() {
        let mut r = TraceReader::new(&b"R 0x0\n\xff\xfe 0x10\nR 0x0\n"[..]);
        assert_eq!(
            r.next().unwrap().unwrap(),
            TraceEntry::new(Op::Read, Addr::new(0x0))
        );
        assert!(r.next().is_none());
        assert_eq!(r.line_no(), 2);
        assert!(r.next().is_none());
    }
    #[test]
    fn test_reader_crlf() {
        let got: Vec<_> = TraceReader::new("W 0x8\r\nR 0x10\r\n".as_bytes())
            .map(|e| e.unwrap())
            .collect();
        assert_eq!(got[1], TraceEntry::new(Op::Read, Addr::new(0x10)));
    }
    #[test]
    fn test_reader_without_trailing_newline() {
        let r = TraceReader::new("R 0x0\nR 0x400".as_bytes());
        assert_eq!(r.count(), 2);
    }
}
