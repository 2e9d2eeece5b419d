//! CLI command implementations.

pub mod actions;
pub mod check;
pub mod profiles;
pub mod run;

use clap::ValueEnum;
use kestrel_translation::ProfileType;

/// Profile type as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TypeArg {
    Input,
    Output,
}

impl From<TypeArg> for ProfileType {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::Input => ProfileType::Input,
            TypeArg::Output => ProfileType::Output,
        }
    }
}
