//! Terminal messages outside the report itself

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("⚠️  {}", message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("ℹ️  {}", message);
}

/// Banner printed before the per-page report
pub fn print_banner(title: &str) {
    let rule = "=".repeat(70);
    println!("\n{}", rule);
    println!("  {}", title);
    println!("{}", rule);
}
