use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::io::Write;

#[test]
fn command_cmp_restricted_pair() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let t1_path = dir.path().join("t1.nwk");
    {
        let mut f = std::fs::File::create(&t1_path)?;
        writeln!(f, "(((A,B,C),D),E);")?;
    }
    let t2_path = dir.path().join("t2.nwk");
    {
        let mut f = std::fs::File::create(&t2_path)?;
        writeln!(f, "((((A,B),C),D),E);")?;
    }

    let mut cmd = cargo_bin_cmd!("mulrfs");
    cmd.arg("cmp").arg(&t1_path).arg(&t2_path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1,5,1,2,0,1,0.250000"));
    Ok(())
}

#[test]
fn command_cmp_identical_trees() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let t_path = dir.path().join("t.nwk");
    {
        let mut f = std::fs::File::create(&t_path)?;
        writeln!(f, "((A,B),((C,D),E));")?;
    }

    let mut cmd = cargo_bin_cmd!("mulrfs");
    cmd.arg("cmp").arg(&t_path).arg(&t_path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1,5,2,2,0,0,0.000000"));
    Ok(())
}

#[test]
fn command_cmp_prefix() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let t_path = dir.path().join("t.nwk");
    {
        let mut f = std::fs::File::create(&t_path)?;
        writeln!(f, "((A,B),(C,D));")?;
    }

    let mut cmd = cargo_bin_cmd!("mulrfs");
    cmd.arg("cmp")
        .arg(&t_path)
        .arg(&t_path)
        .arg("-p")
        .arg("rep01");
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("rep01,1,"));
    Ok(())
}

#[test]
fn command_cmp_broadcast_and_sum() -> anyhow::Result<()> {
    // One reference tree against a list, cumulative output only
    let dir = tempfile::tempdir()?;
    let s_path = dir.path().join("s.nwk");
    {
        let mut f = std::fs::File::create(&s_path)?;
        writeln!(f, "((A,B),((C,D),E));")?;
    }
    let g_path = dir.path().join("g.nwk");
    {
        let mut f = std::fs::File::create(&g_path)?;
        writeln!(f, "((A,B),((C,D),E));")?;
        writeln!(f, "((A,C),((B,D),E));")?;
    }

    let mut cmd = cargo_bin_cmd!("mulrfs");
    let output = cmd
        .arg("cmp")
        .arg(&s_path)
        .arg(&g_path)
        .arg("--sum")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(output.status.success());
    assert_eq!(stdout, "2,2,1.000000\n");

    Ok(())
}

#[test]
fn command_cmp_too_few_shared_leaves() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let t_path = dir.path().join("t.nwk");
    {
        let mut f = std::fs::File::create(&t_path)?;
        writeln!(f, "(A,B,C);")?;
    }

    let mut cmd = cargo_bin_cmd!("mulrfs");
    cmd.arg("cmp").arg(&t_path).arg(&t_path);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("1,3,0,0,0,0,NA"));
    Ok(())
}
