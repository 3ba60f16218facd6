//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

mod common;

use common::{run_test, run_test_base, TestPlan};

fn glslpp_test(args: &[&str], stdin_data: &str, expected_out: &str, expected_err: &str, code: i32) {
    run_test(TestPlan {
        args: args.iter().map(|s| s.to_string()).collect(),
        stdin_data: String::from(stdin_data),
        expected_out: String::from(expected_out),
        expected_err: String::from(expected_err),
        expected_exit_code: code,
    });
}

#[test]
fn test_object_macro() {
    glslpp_test(
        &[],
        "#define FOO 1\nint x = FOO;\n",
        "int x = 1;\n",
        "",
        0,
    );
}

#[test]
fn test_function_macro() {
    glslpp_test(
        &[],
        "#define ADD(a,b) ((a)+(b))\nfloat y = ADD(1, 2);\n",
        "float y = ((1)+(2));\n",
        "",
        0,
    );
}

#[test]
fn test_reserved_name_fails() {
    glslpp_test(
        &[],
        "#define GL_FOO 1\nGL_FOO\n",
        "GL_FOO\n",
        "stdin:1: error: macro name is reserved: GL_FOO\n",
        1,
    );
}

#[test]
fn test_user_error() {
    glslpp_test(
        &[],
        "#if !defined(FEATURE)\n#error FEATURE required\n#endif\n",
        "",
        "stdin:2: error: #error FEATURE required\n",
        1,
    );
}

#[test]
fn test_warning_does_not_fail() {
    glslpp_test(
        &[],
        "#if 1\nx\n",
        "x\n",
        "stdin:1: warning: unterminated conditional directive\n",
        0,
    );
}

#[test]
fn test_command_line_defines() {
    glslpp_test(
        &["-D", "SIZE=4", "-DFLAG"],
        "SIZE FLAG\n",
        "4 1\n",
        "",
        0,
    );
    glslpp_test(&["-U", "GL_ES"], "GL_ES\n", "GL_ES\n", "", 0);
    glslpp_test(&["--no-predefined"], "__VERSION__\n", "__VERSION__\n", "", 0);
}

#[test]
fn test_invalid_define_name() {
    let output = run_test_base(&["-D".to_string(), "1X=2".to_string()], b"");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid macro name"), "{stderr}");
}

#[test]
fn test_records_printed_first() {
    glslpp_test(
        &[],
        "#version 300 es\n#extension GL_EXT_foo : enable\n#pragma optimize(off)\nvoid main() {}\n",
        "#version 300 es\n#extension GL_EXT_foo : enable\n#pragma optimize(off)\nvoid main() {}\n",
        "",
        0,
    );
}

#[test]
fn test_dump_tokens() {
    glslpp_test(
        &["--dump-tokens"],
        "a\n b+1.0\n",
        "1:identifier:a\n2:identifier:b\n2:punct:+\n2:float:1.0\n",
        "",
        0,
    );
}

#[test]
fn test_multiple_files() {
    let dir = std::path::Path::new(env!("CARGO_TARGET_TMPDIR")).join("glslpp_multiple_files");
    std::fs::create_dir_all(&dir).unwrap();
    let first = dir.join("defs.glsl");
    let second = dir.join("main.glsl");
    std::fs::write(&first, "#define N 2\n").unwrap();
    std::fs::write(&second, "N __FILE__ __LINE__\n#error stop\n").unwrap();

    glslpp_test(
        &[first.to_str().unwrap(), second.to_str().unwrap()],
        "",
        "2 1 1\n",
        &format!("{}:2: error: #error stop\n", second.display()),
        1,
    );
}

#[test]
fn test_missing_file() {
    let output = run_test_base(&["/nonexistent/glslpp/input.vert".to_string()], b"");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("glslpp: /nonexistent/glslpp/input.vert: "), "{stderr}");
}
