// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for h68asm.

fn main() {
    let use_color = std::env::var("NO_COLOR").is_err();
    std::process::exit(h68asm::assembler::run(use_color));
}
