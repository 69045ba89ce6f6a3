use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use loxwalk::Loxwalk;

struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `source` as a whole program through the real pipeline and returns
/// everything written by `print`. Compile and runtime errors still go to
/// stderr as usual; use `tests/cli.rs` when a test needs to assert on those.
pub fn run(source: &str) -> String {
    let sink = Rc::new(RefCell::new(Vec::new()));
    let mut loxwalk = Loxwalk::new(Box::new(SharedBuffer(sink.clone())));
    loxwalk.run_line(source);
    let bytes = sink.borrow().clone();
    String::from_utf8(bytes).unwrap()
}

/// Like [`run`], but asserts the program produced no compile or runtime
/// error along the way.
pub fn run_ok(source: &str) -> String {
    loxwalk::error::reset_error();
    let output = run(source);
    assert!(!loxwalk::error::did_error(), "expected no compile error for: {source}");
    assert!(!loxwalk::error::did_runtime_error(), "expected no runtime error for: {source}");
    output
}

#[macro_export]
macro_rules! lox_test {
    ($name:ident, $source:expr $(, $expected:expr)* $(,)?) => {
        #[test]
        fn $name() {
            let mut expected = vec![$($expected),*];
            let expected = if expected.is_empty() {
                String::new()
            } else {
                expected.push("");
                expected.join("\n")
            };
            assert_eq!($crate::common::run_ok($source), expected);
        }
    };
}
