//! Canonical fixture tree shared by the owners database, finder and CLI
//! tests: a small repository tree with nested OWNERS files,
//! `set noparent` directories and a wildcard-owned corner.

use crate::MemFileSystem;

pub const BEN: &str = "ben@example.com";
pub const BRETT: &str = "brett@example.com";
pub const DARIN: &str = "darin@example.com";
pub const JOHN: &str = "john@example.com";
pub const KEN: &str = "ken@example.com";
pub const PETER: &str = "peter@example.com";
pub const TOM: &str = "tom@example.com";

pub const DEFAULT_FILES: &[&str] = &[
    "base/vlog.h",
    "chrome/browser/defaults.h",
    "chrome/gpu/gpu_channel.h",
    "chrome/renderer/gpu/gpu_channel_host.h",
    "chrome/renderer/safe_browsing/scorer.h",
    "content/content.gyp",
    "content/bar/foo.cc",
    "content/baz/ugly.cc",
    "content/baz/ugly.h",
    "content/views/pie.h",
];

pub struct OwnersFileOptions<'a> {
    pub comment: Option<&'a str>,
    pub noparent: bool,
    pub owners: &'a [&'a str],
}

pub fn owners_file(options: OwnersFileOptions) -> String {
    let mut text = String::new();
    if let Some(comment) = options.comment {
        text.push_str(&format!("# {comment}\n"));
    }
    if options.noparent {
        text.push_str("set noparent\n");
    }
    for owner in options.owners {
        text.push_str(owner);
        text.push('\n');
    }
    text
}

fn plain(owners: &'static [&'static str]) -> String {
    owners_file(OwnersFileOptions {
        comment: None,
        noparent: false,
        owners,
    })
}

pub fn test_repo() -> MemFileSystem {
    let mut fs = MemFileSystem::new();
    fs.add_file("/DEPS", "");
    fs.add_file("/OWNERS", plain(&[KEN, PETER, TOM]));
    fs.add_file("/base/vlog.h", "");
    fs.add_file("/chrome/OWNERS", plain(&[BEN, BRETT]));
    fs.add_file("/chrome/browser/OWNERS", plain(&[BRETT]));
    fs.add_file("/chrome/browser/defaults.h", "");
    fs.add_file("/chrome/gpu/OWNERS", plain(&[KEN]));
    fs.add_file("/chrome/gpu/gpu_channel.h", "");
    fs.add_file("/chrome/renderer/OWNERS", plain(&[PETER]));
    fs.add_file("/chrome/renderer/gpu/gpu_channel_host.h", "");
    fs.add_file("/chrome/renderer/safe_browsing/scorer.h", "");
    fs.add_file(
        "/content/OWNERS",
        owners_file(OwnersFileOptions {
            comment: Some("foo"),
            noparent: true,
            owners: &[JOHN, DARIN],
        }),
    );
    fs.add_file("/content/content.gyp", "");
    fs.add_file("/content/bar/foo.cc", "");
    fs.add_file("/content/baz/OWNERS", plain(&[BRETT]));
    fs.add_file("/content/baz/froboz.h", "");
    fs.add_file("/content/baz/ugly.cc", "");
    fs.add_file("/content/baz/ugly.h", "");
    fs.add_file(
        "/content/views/OWNERS",
        owners_file(OwnersFileOptions {
            comment: None,
            noparent: true,
            owners: &[BEN, JOHN, "*"],
        }),
    );
    fs.add_file("/content/views/pie.h", "");
    fs
}
