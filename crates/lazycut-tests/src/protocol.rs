//! Integration tests for the BMP frame-stream framing.

use lazycut_core::LazycutError;
use lazycut_media::stream::{read_frame, BMP_HEADER_LEN};
use std::io::{Cursor, Write};
use std::process::{Command, Stdio};
use std::thread;

/// A BMP-framed blob of `total` bytes whose body is filled with `fill`.
fn bmp(total: u32, fill: u8) -> Vec<u8> {
    let mut frame = vec![fill; total as usize];
    frame[0] = b'B';
    frame[1] = b'M';
    frame[2..6].copy_from_slice(&total.to_le_bytes());
    frame
}

#[test]
fn consecutive_frames_are_split_on_declared_size() {
    let mut bytes = bmp(64, 1);
    bytes.extend(bmp(BMP_HEADER_LEN as u32, 2));
    bytes.extend(bmp(100, 3));
    let mut reader = Cursor::new(bytes);

    let first = read_frame(&mut reader).unwrap();
    assert_eq!(first.len(), 64);
    assert!(first[BMP_HEADER_LEN..].iter().all(|&b| b == 1));

    let header_only = read_frame(&mut reader).unwrap();
    assert_eq!(header_only.len(), BMP_HEADER_LEN);

    let third = read_frame(&mut reader).unwrap();
    assert_eq!(third.len(), 100);

    let end = read_frame(&mut reader).unwrap_err();
    assert!(end.is_end_of_stream());
}

#[test]
fn truncated_body_is_end_of_stream_not_partial_frame() {
    let mut bytes = bmp(32, 7);
    let mut cut = bmp(1000, 8);
    cut.truncate(500);
    bytes.extend(cut);
    let mut reader = Cursor::new(bytes);

    assert_eq!(read_frame(&mut reader).unwrap().len(), 32);
    assert!(read_frame(&mut reader).unwrap_err().is_end_of_stream());
}

#[test]
fn corrupt_header_is_framing_error() {
    let mut bad = bmp(32, 0);
    bad[0] = b'P';
    assert!(matches!(
        read_frame(&mut Cursor::new(bad)),
        Err(LazycutError::Framing(_))
    ));

    let mut tiny = bmp(32, 0);
    tiny[2..6].copy_from_slice(&5u32.to_le_bytes());
    assert!(matches!(
        read_frame(&mut Cursor::new(tiny)),
        Err(LazycutError::Framing(_))
    ));
}

#[test]
fn frames_survive_a_real_pipe() {
    // `cat` relays stdin to stdout in arbitrary chunk sizes.
    let Ok(mut child) = Command::new("cat")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
    else {
        return;
    };
    let mut stdin = child.stdin.take().unwrap();
    let mut stdout = child.stdout.take().unwrap();

    let writer = thread::spawn(move || {
        for i in 0..20u8 {
            stdin.write_all(&bmp(4096 + u32::from(i), i)).unwrap();
        }
        // Dropping stdin closes the pipe.
    });

    for i in 0..20u8 {
        let frame = read_frame(&mut stdout).unwrap();
        assert_eq!(frame.len(), 4096 + usize::from(i));
        assert_eq!(frame[BMP_HEADER_LEN], i);
    }
    assert!(read_frame(&mut stdout).unwrap_err().is_end_of_stream());

    writer.join().unwrap();
    child.wait().unwrap();
}
