use assert_cmd::Command;

#[test]
fn runs_a_script_and_exits_zero() {
    Command::cargo_bin("loxwalk")
        .unwrap()
        .arg("tests/fixtures/ok.lox")
        .assert()
        .success()
        .stdout("hello, world\n");
}

#[test]
fn compile_error_exits_65() {
    Command::cargo_bin("loxwalk")
        .unwrap()
        .arg("tests/fixtures/compile_error.lox")
        .assert()
        .code(65)
        .stderr("[line 1] Error at ';': Expected expression\n");
}

#[test]
fn runtime_error_exits_70() {
    Command::cargo_bin("loxwalk")
        .unwrap()
        .arg("tests/fixtures/runtime_error.lox")
        .assert()
        .code(70)
        .stderr("Division by zero.\n[line 1]\n");
}

#[test]
fn missing_file_exits_74() {
    Command::cargo_bin("loxwalk")
        .unwrap()
        .arg("tests/fixtures/does_not_exist.lox")
        .assert()
        .code(74);
}

#[test]
fn too_many_arguments_exits_64() {
    Command::cargo_bin("loxwalk")
        .unwrap()
        .arg("tests/fixtures/ok.lox")
        .arg("extra")
        .assert()
        .code(64)
        .stderr("Usage: loxwalk [script]\n");
}
