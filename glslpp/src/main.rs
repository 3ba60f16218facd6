//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//

use clap::Parser;
use glslpp::GetExitCode;

fn main() {
    env_logger::init();
    let args = glslpp::Args::parse();

    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    let result = glslpp::run(stdout.lock(), stderr.lock(), args);
    std::process::exit(result.get_exit_code());
}
