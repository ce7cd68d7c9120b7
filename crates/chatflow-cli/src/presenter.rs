use std::fmt::Write;

use chatflow_engine::Outcome;
use chatflow_spec::{
    AnswerRecord, Catalog, InputError, Progress, StepDescriptor, StepId, render_json_ui,
    render_text,
};
use clap::ValueEnum;

/// Controls which bits of state the chat prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Prompts only.
    Clean,
    /// Also progress counters, field keys and error codes.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RenderMode {
    Text,
    Json,
}

/// Prints engine outcomes as a terminal transcript.
pub struct ChatPresenter {
    verbosity: Verbosity,
    format: RenderMode,
    show_answers_json: bool,
    section: Option<StepId>,
}

impl ChatPresenter {
    pub fn new(verbosity: Verbosity, format: RenderMode, show_answers_json: bool) -> Self {
        Self {
            verbosity,
            format,
            show_answers_json,
            section: None,
        }
    }

    pub fn show_header(&self, catalog: &Catalog) {
        println!("Dialogue: {}", catalog.title);
        if self.verbosity.is_verbose() {
            println!("Catalog: {} v{}", catalog.id, catalog.version);
            if let Some(description) = &catalog.description {
                println!("{}", description);
            }
        }
        println!("Type 'restart' to start over or 'exit' to leave.");
    }

    pub fn show_outcome(&mut self, outcome: &Outcome, progress: Progress) {
        match outcome {
            Outcome::Asking { descriptor } | Outcome::Terminal { descriptor } => {
                self.show_prompt(descriptor, progress);
            }
            Outcome::Transitioning { from, next } => {
                if self.verbosity.is_verbose() {
                    println!("-- leaving step {} --", from);
                }
                self.show_prompt(next, progress);
            }
            Outcome::Rejected { descriptor, error } => {
                self.show_rejection(error);
                self.show_prompt(descriptor, progress);
            }
            Outcome::Exhausted { after } => {
                eprintln!(
                    "The dialogue has no step after {} and never reached an end; check the catalog.",
                    after
                );
            }
        }
    }

    fn show_prompt(&mut self, descriptor: &StepDescriptor, progress: Progress) {
        if let Some(section) = &descriptor.section
            && self.section != Some(section.step_id)
        {
            println!();
            println!("{}", section.content);
            self.section = Some(section.step_id);
        } else if descriptor.section.is_none() {
            self.section = None;
        }

        if self.verbosity.is_verbose() {
            println!(
                "[{}] ({}/{})",
                descriptor.field, progress.answered, progress.total
            );
        }

        match self.format {
            RenderMode::Text => println!("{}", render_text(descriptor)),
            RenderMode::Json => match serde_json::to_string_pretty(&render_json_ui(descriptor)) {
                Ok(json) => println!("{}", json),
                Err(err) => eprintln!("Failed to render prompt as JSON: {}", err),
            },
        }
    }

    fn show_rejection(&self, error: &InputError) {
        eprintln!("Invalid answer: {}", error);
        if self.verbosity.is_verbose() {
            eprintln!("  Code: {}", error.code());
        }
    }

    pub fn show_completion(&self, answers: &AnswerRecord) {
        println!("Done ✅");
        match answers.to_cbor() {
            Ok(bytes) => {
                println!("Answers (CBOR hex): {}", encode_hex(&bytes));
            }
            Err(err) => {
                eprintln!("Failed to serialize answers to CBOR: {}", err);
            }
        }
        if self.show_answers_json {
            match answers.to_json_pretty() {
                Ok(pretty) => println!("{}", pretty),
                Err(err) => {
                    eprintln!("Failed to serialize answers to JSON: {}", err);
                }
            }
        }
    }
}

pub fn encode_hex(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(&mut encoded, "{:02x}", byte).expect("writing to string cannot fail");
    }
    encoded
}
