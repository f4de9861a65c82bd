use crate::{
    backend::TranspileOptions,
    middle::{ast::Document, trace::ValidationResults},
};

mod wgsl;

pub use self::wgsl::CodeGeneratorWgsl;

pub trait CodeGenerator {
    fn translate(
        &self,
        document: &Document,
        results: &ValidationResults,
        options: &TranspileOptions,
    ) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Target {
    #[default]
    Wgsl,
}

impl Target {
    pub fn get_code_generator(self) -> impl CodeGenerator {
        match self {
            Target::Wgsl => CodeGeneratorWgsl,
        }
    }
}
