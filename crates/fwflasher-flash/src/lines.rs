//! Splitting tool output into lines
//!
//! esptool redraws its progress with a bare `\r`, so `\n`, `\r\n` and a lone
//! `\r` all end a line. Invalid UTF-8 is replaced, never dropped.

pub(crate) struct LineSplitter {
    buf: Vec<u8>,
    after_cr: bool,
}

impl LineSplitter {
    pub(crate) fn new() -> Self {
        Self {
            buf: Vec::new(),
            after_cr: false,
        }
    }

    /// Feed raw output, emitting every completed line
    pub(crate) fn feed(&mut self, data: &[u8], emit: &mut impl FnMut(String)) {
        for &byte in data {
            match byte {
                b'\n' if self.after_cr => self.after_cr = false,
                b'\n' => self.flush(emit),
                b'\r' => {
                    self.flush(emit);
                    self.after_cr = true;
                }
                _ => {
                    self.after_cr = false;
                    self.buf.push(byte);
                }
            }
        }
    }

    /// Emit a trailing unterminated line, if any
    pub(crate) fn finish(mut self, emit: &mut impl FnMut(String)) {
        if !self.buf.is_empty() {
            self.flush(emit);
        }
    }

    fn flush(&mut self, emit: &mut impl FnMut(String)) {
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        emit(line);
    }
}
