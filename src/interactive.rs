//! The interactive reviewer-selection loop.
//!
//! Generic over input and output streams so integration tests can script a
//! whole session against an in-memory file system.

use std::io::{BufRead, Write};

use anyhow::Context;
use owners::{FileSystem, OutputEvent, OwnersFinder};
use tracing::debug;

use crate::render::{owner_name, render_events};

/// Drive `finder` to completion, proposing candidates from the owners queue
/// and applying the user's commands. Returns the process exit code: success
/// once a covering reviewer set is reached (or the input ends), failure if
/// the user quits.
pub fn run_session<F, R, W>(
    mut finder: OwnersFinder<F>,
    mut input: R,
    out: &mut W,
) -> anyhow::Result<i32>
where
    F: FileSystem,
    R: BufRead,
    W: Write,
{
    if !finder.unowned_files().is_empty() {
        render_events(
            out,
            &[OutputEvent::Block {
                header: String::from("These files have no owners:"),
                lines: finder.unowned_files().to_vec(),
            }],
        )?;
    }

    let mut deferred: Vec<String> = Vec::new();
    while !finder.is_complete() {
        let Some(owner) = propose(&finder, &mut deferred) else {
            break;
        };
        write!(
            out,
            "Add {} as a reviewer ({} file(s) left)? [y/n/d/f/o/p/i/r/q] ",
            owner_name(&owner),
            finder.remaining_coverage(&owner),
        )?;
        out.flush()?;

        let Some(line) = read_line(&mut input)? else {
            debug!("input exhausted, finishing session");
            break;
        };
        match line.as_str() {
            "y" | "yes" => apply(&mut finder, out, |finder| finder.select_owner(&owner))?,
            "n" | "no" => apply(&mut finder, out, |finder| finder.deselect_owner(&owner))?,
            "" | "d" | "defer" => deferred.push(owner),
            "f" | "files" => {
                let unreviewed: Vec<String> = finder.unreviewed_files().iter().cloned().collect();
                for file in &unreviewed {
                    finder.print_file_info(file)?;
                }
            }
            "o" | "owners" => render_events(
                out,
                &[OutputEvent::Block {
                    header: String::from("Owners queue:"),
                    lines: finder.owners_queue().to_vec(),
                }],
            )?,
            "i" | "info" => {
                finder.print_comments(&owner);
                render_events(
                    out,
                    &[OutputEvent::Block {
                        header: format!("{} could approve:", owner_name(&owner)),
                        lines: finder
                            .unreviewed_files()
                            .iter()
                            .filter(|&file| approvable_by(&finder, file, &owner))
                            .cloned()
                            .collect(),
                    }],
                )?;
            }
            "r" | "restart" => {
                finder.reset();
                deferred.clear();
            }
            "q" | "quit" => return Ok(exitcode::TEMPFAIL),
            command => {
                if let Some(wanted) = command
                    .strip_prefix("p ")
                    .or_else(|| command.strip_prefix("pick "))
                {
                    pick_owner(&mut finder, out, wanted.trim())?;
                } else if command == "p" || command == "pick" {
                    write!(out, "Pick an owner: ")?;
                    out.flush()?;
                    match read_line(&mut input)? {
                        Some(wanted) => pick_owner(&mut finder, out, &wanted)?,
                        None => break,
                    }
                } else {
                    writeln!(out, "Unknown command: {command:?}")?;
                }
            }
        }
        render_events(out, &finder.take_output())?;
    }

    print_result(&mut finder, out)?;
    Ok(exitcode::OK)
}

/// Select an owner out of queue order, matching the argument against the
/// known owner set: exact identifier first, then unique local part, then
/// unique substring.
fn pick_owner<F: FileSystem>(
    finder: &mut OwnersFinder<F>,
    out: &mut impl Write,
    wanted: &str,
) -> anyhow::Result<()> {
    let resolved = resolve_owner(finder, wanted);
    match resolved {
        Some(owner) => apply(finder, out, |finder| finder.select_owner(&owner)),
        None => {
            writeln!(out, "No unique owner matches {wanted:?}")?;
            Ok(())
        }
    }
}

fn resolve_owner<F: FileSystem>(finder: &OwnersFinder<F>, wanted: &str) -> Option<String> {
    if finder.all_owners().contains(wanted) {
        return Some(wanted.to_string());
    }
    let by_local_part: Vec<&String> = finder
        .all_owners()
        .iter()
        .filter(|owner| owner.split('@').next() == Some(wanted))
        .collect();
    if let [owner] = by_local_part.as_slice() {
        return Some((*owner).clone());
    }
    let by_substring: Vec<&String> = finder
        .all_owners()
        .iter()
        .filter(|owner| owner.contains(wanted))
        .collect();
    match by_substring.as_slice() {
        [owner] => Some((*owner).clone()),
        _ => None,
    }
}

/// Run a finder command, reporting a rejected precondition to the user
/// instead of aborting the session.
fn apply<F: FileSystem>(
    finder: &mut OwnersFinder<F>,
    out: &mut impl Write,
    command: impl FnOnce(&mut OwnersFinder<F>) -> owners::Result<()>,
) -> anyhow::Result<()> {
    if let Err(error) = command(finder) {
        writeln!(out, "{error}")?;
    }
    Ok(())
}

/// Next owner to propose: the first queued owner that still contributes and
/// has not been deferred. Once every contributing owner is deferred the
/// deferral round resets, so deferred owners come back around.
fn propose<F: FileSystem>(finder: &OwnersFinder<F>, deferred: &mut Vec<String>) -> Option<String> {
    let next = |deferred: &[String]| {
        finder
            .owners_queue()
            .iter()
            .find(|&owner| finder.remaining_coverage(owner) > 0 && !deferred.contains(owner))
            .cloned()
    };
    next(deferred).or_else(|| {
        deferred.clear();
        next(deferred)
    })
}

fn approvable_by<F: FileSystem>(finder: &OwnersFinder<F>, file: &str, owner: &str) -> bool {
    finder
        .files_to_owners()
        .get(file)
        .is_some_and(|owners| owners.contains(owner))
}

fn read_line(input: &mut impl BufRead) -> anyhow::Result<Option<String>> {
    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .context("failed to read command")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_lowercase()))
}

/// Final report: each selected owner with the files credited to them, in
/// selection order with files sorted.
fn print_result<F: FileSystem>(
    finder: &mut OwnersFinder<F>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    if finder.selected_owners().is_empty() {
        writeln!(out, "No reviewers selected.")?;
        return Ok(());
    }

    writeln!(out, "** You selected these owners **")?;
    let selected: Vec<String> = finder.selected_owners().iter().cloned().collect();
    let mut events = Vec::with_capacity(selected.len());
    for owner in selected {
        let mut credited: Vec<String> = finder
            .reviewed_by()
            .iter()
            .filter(|(_, credited)| **credited == owner)
            .map(|(file, _)| file.clone())
            .collect();
        credited.sort();
        events.push(OutputEvent::Block {
            header: format!("{}:", owner_name(&owner)),
            lines: credited,
        });
    }
    render_events(out, &events)?;
    Ok(())
}
