// SPDX-FileCopyrightText: 2025 Semiotic AI, Inc.
//
// SPDX-License-Identifier: Apache-2.0

use std::process::ExitCode;

use blocktx::bootstrap::run;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = run().await {
        // Logging may not be initialized yet
        eprintln!("blocktx failed: {e:#}");
        tracing::error!("blocktx failed: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}
