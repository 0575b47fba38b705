mod support;

use std::sync::Arc;

use scanscribe::{Error, ImageDescriptor, ImageSource, RemoteSource};
use support::{FakeDrive, file, folder};

fn identities(found: &[ImageDescriptor]) -> Vec<&str> {
    found.iter().map(|d| d.identity.as_str()).collect()
}

#[test]
fn pagination_collects_every_page_in_order() -> anyhow::Result<()> {
    let drive = Arc::new(FakeDrive::new().folder(
        "root",
        vec![
            vec![file("1", "p1a.png"), file("2", "p1b.png")],
            vec![file("3", "p2a.png"), file("4", "p2b.png")],
            vec![file("5", "p3a.png"), file("6", "p3b.png")],
        ],
    ));

    let found = RemoteSource::new(drive.clone(), "root", 8).discover()?;

    assert_eq!(
        identities(&found),
        ["p1a.png", "p1b.png", "p2a.png", "p2b.png", "p3a.png", "p3b.png"]
    );
    assert_eq!(drive.list_calls.get(), 3);
    assert_eq!(
        *drive.listed.borrow(),
        vec![
            ("root".to_string(), None),
            ("root".to_string(), Some("page-1".to_string())),
            ("root".to_string(), Some("page-2".to_string())),
        ]
    );
    Ok(())
}

#[test]
fn recursion_lists_parent_files_before_subfolders() -> anyhow::Result<()> {
    // The subfolder is listed before the file; the parent's own files still come first.
    let drive = Arc::new(
        FakeDrive::new()
            .folder("A", vec![vec![folder("B"), file("a1", "a1.png")]])
            .folder("B", vec![vec![folder("C")], vec![file("b1", "b1.jpg")]])
            .folder("C", vec![vec![file("c1", "c1.tiff")]]),
    );

    let found = RemoteSource::new(drive, "A", 8).discover()?;

    assert_eq!(identities(&found), ["a1.png", "b1.jpg", "c1.tiff"]);
    assert_eq!(found[0], ImageDescriptor::remote("a1", "a1.png"));
    Ok(())
}

#[test]
fn sibling_subfolders_are_walked_depth_first() -> anyhow::Result<()> {
    let drive = Arc::new(
        FakeDrive::new()
            .folder("A", vec![vec![folder("B"), folder("D")]])
            .folder("B", vec![vec![file("b1", "b1.png"), folder("C")]])
            .folder("C", vec![vec![file("c1", "c1.png")]])
            .folder("D", vec![vec![file("d1", "d1.png")]]),
    );

    let found = RemoteSource::new(drive, "A", 8).discover()?;

    assert_eq!(identities(&found), ["b1.png", "c1.png", "d1.png"]);
    Ok(())
}

#[test]
fn non_image_files_are_excluded_case_insensitively() -> anyhow::Result<()> {
    let drive = Arc::new(FakeDrive::new().folder(
        "root",
        vec![vec![file("1", "notes.pdf"), file("2", "scan.PNG")]],
    ));

    let found = RemoteSource::new(drive, "root", 8).discover()?;

    assert_eq!(identities(&found), ["scan.PNG"]);
    Ok(())
}

#[test]
fn names_that_cannot_be_staged_are_excluded() -> anyhow::Result<()> {
    let drive = Arc::new(FakeDrive::new().folder(
        "root",
        vec![vec![file("1", "../escape.png"), file("2", "ok.png")]],
    ));

    let found = RemoteSource::new(drive, "root", 8).discover()?;

    assert_eq!(identities(&found), ["ok.png"]);
    Ok(())
}

#[test]
fn nesting_beyond_max_depth_is_rejected() {
    let drive = Arc::new(
        FakeDrive::new()
            .folder("L0", vec![vec![folder("L1")]])
            .folder("L1", vec![vec![folder("L2")]])
            .folder("L2", vec![vec![folder("L3")]])
            .folder("L3", vec![vec![file("deep", "deep.png")]]),
    );

    let err = RemoteSource::new(drive.clone(), "L0", 2)
        .discover()
        .unwrap_err();

    match err {
        Error::DepthExceeded {
            folder_id,
            max_depth,
        } => {
            assert_eq!(folder_id, "L3");
            assert_eq!(max_depth, 2);
        }
        other => panic!("expected depth error, got {other:?}"),
    }

    let found = RemoteSource::new(drive, "L0", 3)
        .discover()
        .expect("depth 3 is allowed");
    assert_eq!(identities(&found), ["deep.png"]);
}

#[test]
fn cyclic_folders_are_listed_once() -> anyhow::Result<()> {
    let drive = Arc::new(
        FakeDrive::new()
            .folder("A", vec![vec![file("a1", "a1.png"), folder("B")]])
            .folder("B", vec![vec![file("b1", "b1.png"), folder("A")]]),
    );

    let found = RemoteSource::new(drive.clone(), "A", 8).discover()?;

    assert_eq!(identities(&found), ["a1.png", "b1.png"]);
    assert_eq!(drive.list_calls.get(), 2);
    Ok(())
}

#[test]
fn listing_error_in_subfolder_fails_discovery() {
    let drive = Arc::new(
        FakeDrive::new()
            .folder("A", vec![vec![file("a1", "a1.png"), folder("B")]])
            .failing_folder("B"),
    );

    let err = RemoteSource::new(drive, "A", 8).discover().unwrap_err();
    assert!(err.to_string().contains("failed to list remote folder 'B'"));
}
