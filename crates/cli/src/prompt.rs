//! Line-oriented prompts over any reader/writer pair.
//!
//! End of input surfaces as an `UnexpectedEof` I/O error so callers can
//! unwind with `?` and treat it as "leave the menu".

use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::Stylize;
use crossterm::terminal::{Clear, ClearType};
use rust_decimal::Decimal;

pub fn is_eof(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::UnexpectedEof
}

pub struct Console<R, W> {
    input: R,
    output: W,
    styled: bool,
}

impl<R, W> Console<R, W>
where
    R: BufRead,
    W: Write,
{
    /// `styled` enables colours and screen clearing (real terminals only).
    pub fn new(input: R, output: W, styled: bool) -> Self {
        Self {
            input,
            output,
            styled,
        }
    }

    pub fn styled(&self) -> bool {
        self.styled
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.output
    }

    pub fn say(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.output, "{text}")
    }

    pub fn blank(&mut self) -> io::Result<()> {
        writeln!(self.output)
    }

    pub fn success(&mut self, text: impl Display) -> io::Result<()> {
        let text = format!("✓ {text}");
        if self.styled {
            self.say(text.green())
        } else {
            self.say(text)
        }
    }

    pub fn warn(&mut self, text: impl Display) -> io::Result<()> {
        let text = text.to_string();
        if self.styled {
            self.say(text.yellow())
        } else {
            self.say(text)
        }
    }

    pub fn fail(&mut self, text: impl Display) -> io::Result<()> {
        let text = text.to_string();
        if self.styled {
            self.say(text.red())
        } else {
            self.say(text)
        }
    }

    pub fn clear(&mut self) -> io::Result<()> {
        if self.styled {
            queue!(self.output, Clear(ClearType::All), MoveTo(0, 0))?;
        }
        Ok(())
    }

    pub fn header(&mut self, subtitle: &str) -> io::Result<()> {
        self.clear()?;
        let title = "Stockbook - inventory tracker";
        if self.styled {
            self.say(title.magenta().bold())?;
        } else {
            self.say(title)?;
        }
        if !subtitle.is_empty() {
            if self.styled {
                self.say(subtitle.cyan().bold())?;
            } else {
                self.say(subtitle)?;
            }
        }
        self.blank()
    }

    /// Read one trimmed line after showing `prompt`.
    pub fn line(&mut self, prompt: &str) -> io::Result<String> {
        write!(self.output, "{prompt}: ")?;
        self.output.flush()?;

        let mut buf = String::new();
        if self.input.read_line(&mut buf)? == 0 {
            writeln!(self.output)?;
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "end of input"));
        }
        Ok(buf.trim().to_string())
    }

    /// Like [`Console::line`], returning `default` for an empty answer.
    pub fn line_or(&mut self, prompt: &str, default: &str) -> io::Result<String> {
        let answer = if default.is_empty() {
            self.line(prompt)?
        } else {
            self.line(&format!("{prompt} [{default}]"))?
        };
        Ok(if answer.is_empty() {
            default.to_string()
        } else {
            answer
        })
    }

    /// Ask until the answer is one of `choices`.
    pub fn choice(&mut self, prompt: &str, choices: &[&str]) -> io::Result<String> {
        loop {
            let answer = self.line(&format!("{prompt} ({})", choices.join("/")))?;
            if choices.contains(&answer.as_str()) {
                return Ok(answer);
            }
            self.fail("Invalid option")?;
        }
    }

    /// Yes/no question; anything but `y`/`yes` means no.
    pub fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        let answer = self.line(&format!("{prompt} [y/N]"))?;
        Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
    }

    pub fn pause(&mut self) -> io::Result<()> {
        self.blank()?;
        self.line("Press Enter to continue").map(|_| ())
    }

    pub fn number(&mut self, prompt: &str, default: Option<u32>) -> io::Result<u32> {
        self.parsed(prompt, default, "Enter a whole number (0 or more)")
    }

    pub fn decimal(&mut self, prompt: &str, default: Option<Decimal>) -> io::Result<Decimal> {
        self.parsed(prompt, default, "Enter a number such as 9.99")
    }

    fn parsed<T>(&mut self, prompt: &str, default: Option<T>, hint: &str) -> io::Result<T>
    where
        T: FromStr + Display + Copy,
    {
        let prompt = match default {
            Some(value) => format!("{prompt} [{value}]"),
            None => prompt.to_string(),
        };

        loop {
            let answer = self.line(&prompt)?;
            if answer.is_empty() {
                if let Some(value) = default {
                    return Ok(value);
                }
            } else if let Ok(value) = answer.parse::<T>() {
                return Ok(value);
            }
            self.fail(hint)?;
        }
    }
}
