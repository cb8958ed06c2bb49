
// re-exporting functions
mod report;
mod dot;     pub use dot::DotConf;
mod escaper; pub use escaper::*;

#[derive( PartialEq, Debug, Clone, Copy)]
pub enum OutputFormat {
    Report,
    Dot,
}
