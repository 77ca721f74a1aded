use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*;
use std::path::PathBuf;
use std::process::Command; // Run programs
use tempfile;
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

fn make_fixture(dir: &std::path::Path,name: &str) -> PathBuf {
    let mut data = Vec::new();
    while data.len() < 100000 {
        data.extend_from_slice(b"It was the best of times, it was the worst of times. ");
        data.push((data.len() % 17) as u8);
    }
    let path = dir.join(name);
    std::fs::write(&path,&data).expect("fixture write failed");
    path
}

fn round_trip_test(method: &str) -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let in_path = make_fixture(temp_dir.path(),"fixture.txt");
    let cmp_path = temp_dir.path().join("fixture.sqz");
    let out_path = temp_dir.path().join("fixture.out");

    let mut cmd = Command::cargo_bin("squeeze")?;
    cmd.arg("compress")
        .arg("-m").arg(method)
        .arg("-i").arg(&in_path)
        .arg("-o").arg(&cmp_path)
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("squeeze")?;
    cmd.arg("expand")
        .arg("-i").arg(&cmp_path)
        .arg("-o").arg(&out_path)
        .assert()
        .success();

    match (std::fs::read(&in_path),std::fs::read(&out_path)) {
        (Ok(v1),Ok(v2)) => {
            assert_eq!(v1,v2);
        },
        _ => panic!("unable to compare output with reference")
    }
    // repetitive text must actually shrink
    let compressed = std::fs::read(&cmp_path)?;
    let original = std::fs::read(&in_path)?;
    assert!(compressed.len() < original.len() / 2);
    Ok(())
}

#[test]
fn rc_round_trip() -> STDRESULT {
    round_trip_test("rc")
}

#[test]
fn huff_round_trip() -> STDRESULT {
    round_trip_test("huff")
}

#[test]
fn garbage_input_is_rejected() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let bad_path = temp_dir.path().join("bad.sqz");
    let out_path = temp_dir.path().join("bad.out");
    std::fs::write(&bad_path,b"not a squeeze file at all")?;

    let mut cmd = Command::cargo_bin("squeeze")?;
    cmd.arg("expand")
        .arg("-i").arg(&bad_path)
        .arg("-o").arg(&out_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("IllegalSequence"));
    Ok(())
}
