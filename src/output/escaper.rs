use std::io;

///
/// `io::Write` adapter that escapes dot label text: quote marks,
/// backslashes and newlines are written out escaped, everything else
/// passes through untouched.
///
pub struct Escaper<W>
where
    W: io::Write,
{
    pub writer: W,
    pub error: io::Result<usize>,
}


impl<W> Escaper<W>
where
    W: io::Write,
{
    pub fn new(writer: W) -> Self {
        Escaper {
            writer,
            error: Ok(0),
        }
    }
}


impl<W> io::Write for Escaper<W>
where
    W: io::Write
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>
    {
        for &c in buf
        {
            let res = match c
            {
                b'"' | b'\\' => self.writer.write_all(&[b'\\', c]),
                b'\n'        => self.writer.write_all(b"\\n"),
                _            => self.writer.write_all(&[c]),
            };
            if let Err(e) = res
            {
                self.error = Err(io::Error::from(e.kind()));
                return Err(e);
            }
        }
        Ok( buf.len() )
    }

    fn flush(&mut self) -> Result<(), std::io::Error>
    {
        self.writer.flush()
    }
}


#[cfg(test)]
mod tests
{
    use super::*;
    use std::io::Write as _;

    #[test]
    fn quotes_and_backslashes_are_escaped()
    {
        let mut out = Vec::new();
        let mut esc = Escaper::new(&mut out);
        write!(esc, "a\"b\\c").unwrap();
        assert_eq!(out, b"a\\\"b\\\\c");
    }
}
