use std::io::{self, Write};

use colored::Colorize;
use owners::OutputEvent;

/// Print finder output events one per line, indenting block bodies two
/// spaces. Styling is confined to block headers; flat lines pass through
/// untouched so scripted consumers see stable text.
pub fn render_events(out: &mut impl Write, events: &[OutputEvent]) -> io::Result<()> {
    for event in events {
        match event {
            OutputEvent::Line(line) => writeln!(out, "{line}")?,
            OutputEvent::Block { header, lines } => {
                writeln!(out, "{}", header.bold())?;
                for line in lines {
                    writeln!(out, "  {line}")?;
                }
            }
        }
    }
    Ok(())
}

pub fn owner_name(owner: &str) -> String {
    owner.bold().underline().to_string()
}
