//! Interactive read-eval loop over the rate table.
use super::ui;
use crate::core::rates::RateTable;
use crate::core::stats::{StatOutcome, calculate_statistics};
use crate::keeper::KeeperHandle;
use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

const MENU: &str = "Enter the currency pairs you want to analyze, separated by commas (e.g. EUR/PLN, EUR/USD)\n\
In order to show statistics print 'stat EUR/PLN'\n\
In order to stop the program print 'exit'\n\
Your input: ";

/// One line of user input, parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuCommand {
    Exit,
    Stat(Option<String>),
    Show(String),
    Empty,
}

impl MenuCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return MenuCommand::Empty;
        }
        if line.eq_ignore_ascii_case("exit") {
            return MenuCommand::Exit;
        }

        let mut words = line.split_whitespace();
        match words.next() {
            Some(word) if word.eq_ignore_ascii_case("stat") => {
                let pair = words
                    .next()
                    .map(|p| p.trim_matches(|c| c == '(' || c == ')').to_uppercase())
                    .filter(|p| !p.is_empty());
                MenuCommand::Stat(pair)
            }
            _ => MenuCommand::Show(line.to_string()),
        }
    }
}

/// Pairs requested by the user, split by whether the table knows them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub found: Vec<String>,
    pub missing: Vec<String>,
}

/// Splits a comma-separated pair list against `table`, keeping input order and dropping repeats.
pub fn select_pairs(input: &str, table: &RateTable) -> Selection {
    let mut selection = Selection::default();
    for pair in input.split(',').map(|p| p.trim().to_uppercase()) {
        if pair.is_empty() || selection.found.contains(&pair) || selection.missing.contains(&pair)
        {
            continue;
        }
        if table.contains(&pair) {
            selection.found.push(pair);
        } else {
            selection.missing.push(pair);
        }
    }
    selection
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SaveDecision {
    Saved(usize),
    Declined,
    GaveUp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Answer {
    Yes,
    No,
    Invalid,
    Closed,
}

pub struct Session<R, W> {
    input: R,
    output: W,
    keeper: KeeperHandle,
    save_attempts: usize,
}

impl<R, W> Session<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(input: R, output: W, keeper: KeeperHandle, save_attempts: usize) -> Self {
        Self {
            input,
            output,
            keeper,
            save_attempts: save_attempts.max(1),
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Runs until `exit` or end of input.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            write!(self.output, "{MENU}")?;
            self.output.flush()?;

            let Some(line) = self.read_line().await? else {
                debug!("Input closed, ending session");
                writeln!(self.output)?;
                return Ok(());
            };

            match MenuCommand::parse(&line) {
                MenuCommand::Exit => {
                    write!(self.output, "{}", ui::framed("Bye"))?;
                    return Ok(());
                }
                MenuCommand::Stat(Some(pair)) => self.show_statistics(&pair).await?,
                MenuCommand::Stat(None) => {
                    let usage = ui::framed("Usage: stat <PAIR>, e.g. stat EUR/PLN");
                    write!(self.output, "{usage}")?;
                }
                MenuCommand::Show(input) => {
                    self.show_selected_data(&input).await?;
                }
                MenuCommand::Empty => {}
            }
        }
    }

    /// Prints the rows of every known pair in `input`, reports the rest and offers to save.
    pub async fn show_selected_data(&mut self, input: &str) -> Result<Selection> {
        let table = self.keeper.snapshot().await?;
        let selection = select_pairs(input, &table);

        for pair in &selection.found {
            if let Some(series) = table.get(pair) {
                writeln!(
                    self.output,
                    "Data for {}:\n{}",
                    ui::style_text(pair, ui::StyleType::Title),
                    ui::series_table(series)
                )?;
            }
        }

        if !selection.missing.is_empty() {
            let message = format!("Data for {:?} wasn't found", selection.missing);
            write!(
                self.output,
                "{}",
                ui::framed(&ui::style_text(&message, ui::StyleType::Error))
            )?;
        }

        if !selection.found.is_empty() {
            self.ask_to_save(&selection.found).await?;
        }
        Ok(selection)
    }

    /// Asks whether to save `pairs`, re-prompting on unrecognised answers up to the attempt limit.
    pub async fn ask_to_save(&mut self, pairs: &[String]) -> Result<SaveDecision> {
        for attempt in 1..=self.save_attempts {
            write!(self.output, "Do you want to save this data? [Y/N] ")?;
            self.output.flush()?;

            match self.read_answer().await? {
                Answer::Yes => {
                    let rows = self.keeper.save_selected(pairs.to_vec()).await?;
                    let message = format!("Data for {pairs:?} has been saved!");
                    write!(self.output, "{}", ui::framed(&message))?;
                    return Ok(SaveDecision::Saved(rows));
                }
                Answer::No | Answer::Closed => {
                    write!(self.output, "{}", ui::framed(""))?;
                    return Ok(SaveDecision::Declined);
                }
                Answer::Invalid => {
                    debug!(attempt, "Unrecognised save answer");
                    write!(self.output, "{}", ui::framed("Don't understand you, try again"))?;
                }
            }
        }

        warn!(attempts = self.save_attempts, "Giving up on save prompt");
        let message = ui::style_text(
            "Too many invalid answers, data not saved",
            ui::StyleType::Subtle,
        );
        write!(self.output, "{}", ui::framed(&message))?;
        Ok(SaveDecision::GaveUp)
    }

    async fn show_statistics(&mut self, pair: &str) -> Result<()> {
        let table = self.keeper.snapshot().await?;
        match calculate_statistics(&table, pair) {
            StatOutcome::Found { pair, stats } => {
                writeln!(
                    self.output,
                    "Statistics for {}:\n{}",
                    ui::style_text(&pair, ui::StyleType::Title),
                    ui::statistics_table(&stats)
                )?;
            }
            StatOutcome::Empty(pair) => {
                write!(self.output, "{}", ui::framed(&format!("No data for {pair}")))?;
            }
            StatOutcome::NoSuchPair(_) => {
                write!(self.output, "{}", ui::framed("No such pair"))?;
            }
        }
        Ok(())
    }

    async fn read_answer(&mut self) -> Result<Answer> {
        let answer = match self.read_line().await? {
            None => Answer::Closed,
            Some(line) => match line.trim().to_uppercase().as_str() {
                "Y" => Answer::Yes,
                "N" => Answer::No,
                _ => Answer::Invalid,
            },
        };
        Ok(answer)
    }

    async fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self.input.read_line(&mut line).await?;
        Ok((read > 0).then_some(line))
    }
}
