use assert_cmd::Command;

#[test]
fn empty_target_exits_with_code_one() {
    let assert = Command::cargo_bin("powertest")
        .expect("binary present")
        .write_stdin("\n")
        .assert()
        .code(1);

    let stderr = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    assert!(stderr.contains("No target provided"), "stderr was: {stderr}");
}

#[test]
fn eof_on_stdin_also_exits_with_code_one() {
    Command::cargo_bin("powertest")
        .expect("binary present")
        .write_stdin("")
        .assert()
        .code(1);
}

#[test]
fn check_tools_lists_every_wrapped_scanner() {
    let assert = Command::cargo_bin("powertest")
        .expect("binary present")
        .arg("check-tools")
        .assert()
        .success();

    let output = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    for tool in ["nmap", "gobuster", "dirb", "nikto", "sqlmap"] {
        assert!(output.contains(tool), "missing {tool} in: {output}");
    }
}
