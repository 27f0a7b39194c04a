use crate::display::{DisplayError, DisplaySink};
use crate::snapshot::{Field, Snapshot};
use crossterm::cursor::MoveTo;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use crossterm::queue;
use std::io::{self, Write};

/// Redraws the whole form in place on every snapshot.
pub struct TerminalView<W: Write> {
    title: String,
    out: W,
}

impl TerminalView<io::Stdout> {
    pub fn stdout(title: impl Into<String>) -> Self {
        Self::new(title, io::stdout())
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(title: impl Into<String>, out: W) -> Self {
        Self {
            title: title.into(),
            out,
        }
    }
}

impl<W: Write + Send> DisplaySink for TerminalView<W> {
    fn name(&self) -> &'static str {
        "terminal"
    }

    fn apply(&mut self, snapshot: &Snapshot) -> Result<(), DisplayError> {
        let frame = render_frame(&self.title, snapshot);
        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0), Print(frame))?;
        self.out.flush()?;
        Ok(())
    }
}

pub fn render_frame(title: &str, snapshot: &Snapshot) -> String {
    let width = Field::ALL
        .iter()
        .map(|f| f.label().len())
        .max()
        .unwrap_or(0);
    let mut frame = String::new();
    frame.push_str(title);
    frame.push('\n');
    frame.push_str(&"=".repeat(title.chars().count()));
    frame.push('\n');
    for (field, value) in snapshot.iter() {
        frame.push_str(&format!("{:>width$}  {}\n", field.label(), value));
    }
    frame
}
