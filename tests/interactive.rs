use std::io::Cursor;

use owners::OwnersFinder;
use owners_finder::interactive::run_session;
use pretty_assertions::assert_eq;
use test_utils::{
    fixture::{self, BRETT, DARIN, JOHN, PETER},
    MemFileSystem,
};

fn scripted(files: &[&str], commands: &str) -> (i32, String) {
    colored::control::set_override(false);
    let finder = OwnersFinder::new(
        fixture::test_repo(),
        "/",
        files.iter().map(|file| file.to_string()).collect(),
        None,
    )
    .unwrap();
    let mut out = Vec::new();
    let code = run_session(finder, Cursor::new(commands.as_bytes()), &mut out).unwrap();
    (code, String::from_utf8(out).unwrap())
}

fn prompt(owner: &str, left: usize) -> String {
    format!("Add {owner} as a reviewer ({left} file(s) left)? [y/n/d/f/o/p/i/r/q] ")
}

#[test]
fn accepting_every_proposal_reaches_a_covering_set() {
    let (code, output) = scripted(fixture::DEFAULT_FILES, "y\ny\ny\n");

    assert_eq!(code, exitcode::OK);
    assert_eq!(
        output,
        format!(
            "{}Selected: {BRETT}\nDeselected: ben@example.com\n\
             {}Selected: {JOHN}\nDeselected: {DARIN}\n\
             {}Selected: {PETER}\nDeselected: ken@example.com\nDeselected: tom@example.com\n\
             ** You selected these owners **\n\
             {BRETT}:\n\
             \x20 chrome/browser/defaults.h\n\
             \x20 chrome/gpu/gpu_channel.h\n\
             \x20 chrome/renderer/gpu/gpu_channel_host.h\n\
             \x20 chrome/renderer/safe_browsing/scorer.h\n\
             \x20 content/baz/ugly.cc\n\
             \x20 content/baz/ugly.h\n\
             {JOHN}:\n\
             \x20 content/bar/foo.cc\n\
             \x20 content/content.gyp\n\
             {PETER}:\n\
             \x20 base/vlog.h\n",
            prompt(BRETT, 6),
            prompt(JOHN, 2),
            prompt(PETER, 1),
        )
    );
}

#[test]
fn rejecting_all_but_one_candidate_forces_the_last() {
    let (code, output) = scripted(&["content/baz/ugly.cc"], "n\nn\n");

    assert_eq!(code, exitcode::OK);
    assert_eq!(
        output,
        format!(
            "{}Deselected: {BRETT}\n\
             {}Deselected: {JOHN}\nSelected: {DARIN}\n\
             ** You selected these owners **\n\
             {DARIN}:\n\
             \x20 content/baz/ugly.cc\n",
            prompt(BRETT, 1),
            prompt(JOHN, 1),
        )
    );
}

#[test]
fn picking_an_owner_by_local_part_skips_the_queue() {
    let (code, output) = scripted(&["content/baz/ugly.cc"], "p darin\n");

    assert_eq!(code, exitcode::OK);
    assert!(output.contains(&format!("Selected: {DARIN}\n")));
    assert!(output.contains(&format!("{DARIN}:\n\x20 content/baz/ugly.cc\n")));
}

#[test]
fn quitting_aborts_with_a_failure_code() {
    let (code, output) = scripted(fixture::DEFAULT_FILES, "q\n");

    assert_ne!(code, exitcode::OK);
    assert_eq!(output, prompt(BRETT, 6));
}

#[test]
fn deferring_rotates_to_the_next_candidate() {
    let (_, output) = scripted(fixture::DEFAULT_FILES, "d\ny\nq\n");

    assert!(output.starts_with(&prompt(BRETT, 6)));
    assert!(output.contains(&prompt(JOHN, 4)));
    assert!(output.contains(&format!("Selected: {JOHN}\n")));
}

#[test]
fn listing_files_shows_owner_counts() {
    let (_, output) = scripted(&["chrome/browser/defaults.h"], "f\nq\n");

    assert!(output.contains("chrome/browser/defaults.h [5]\n"));
}

#[test]
fn exhausted_input_still_prints_the_result() {
    let (code, output) = scripted(fixture::DEFAULT_FILES, "y\n");

    assert_eq!(code, exitcode::OK);
    assert!(output.contains(&format!("Selected: {BRETT}\n")));
    assert!(output.contains("** You selected these owners **\n"));
}

#[test]
fn unowned_files_are_reported_up_front() {
    colored::control::set_override(false);
    let mut fs = MemFileSystem::new();
    fs.add_file("/third_party/blob.bin", "");
    let finder = OwnersFinder::new(fs, "/", vec![String::from("third_party/blob.bin")], None).unwrap();
    let mut out = Vec::new();
    let code = run_session(finder, Cursor::new(&b""[..]), &mut out).unwrap();

    assert_eq!(code, exitcode::OK);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "These files have no owners:\n\x20 third_party/blob.bin\nNo reviewers selected.\n"
    );
}
