//! Line-oriented console session.
//!
//! Reads commands from any [`BufRead`], turns them into navigation
//! [`Action`]s and writes the resulting screen to any [`Write`]. The binary
//! wires it to stdin and stdout; tests drive it with in-memory buffers.

use std::io::{BufRead, Write};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::Role;
use crate::navigation::{
    transition, Action, MentorView, NavigationState, Outcome, ProfileForm, Screen,
};
use crate::services::Services;

const HELP: &str = "\
Commands:
  help                               show this text
  home                               go to the home screen
  signup                             create an account
  login                              log in
  logout                             log out
  goto <page>                        home, signup, login, student or mentor
  add-subject                        add a subject row
  set-subject <n> <subject> <marks>  fill in subject row n
  remove-subject <n>                 remove subject row n
  submit                             submit your details
  select <user>                      review a student
  back                               return to the student list
  feedback <text>                    leave feedback for the student
  show                               redraw the current screen
  quit                               leave the session";

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Blank line.
    Empty,
    /// Print the command list.
    Help,
    /// Go home.
    Home,
    /// Open the signup screen and prompt for a new account.
    Signup,
    /// Open the login screen and prompt for credentials.
    Login,
    /// Log out.
    Logout,
    /// Switch screen.
    GoTo(Screen),
    /// Add a blank subject row.
    AddSubject,
    /// Fill in a subject row (zero-based).
    SetSubject {
        /// Row index.
        index: usize,
        /// Subject name.
        subject: String,
        /// Marks obtained.
        marks: String,
    },
    /// Remove a subject row (zero-based).
    RemoveSubject(usize),
    /// Prompt for and submit the student form.
    Submit,
    /// Review a student.
    Select(String),
    /// Back to the student list.
    Back,
    /// Leave feedback for the selected student.
    Feedback(String),
    /// Redraw the screen.
    Show,
    /// End the session.
    Quit,
}

impl Command {
    /// Parse one input line.
    ///
    /// Row numbers are typed one-based and stored zero-based.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for unknown commands or bad arguments.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(w, r)| (w, r.trim()));

        let command = match word.to_ascii_lowercase().as_str() {
            "" => Self::Empty,
            "help" | "?" => Self::Help,
            "home" => Self::Home,
            "signup" => Self::Signup,
            "login" => Self::Login,
            "logout" => Self::Logout,
            "goto" => Self::GoTo(rest.parse()?),
            "add-subject" => Self::AddSubject,
            "set-subject" => {
                let words: Vec<&str> = rest.split_whitespace().collect();
                let [row, subject @ .., marks] = words.as_slice() else {
                    return Err(Error::validation(
                        "usage: set-subject <n> <subject> <marks>",
                    ));
                };
                if subject.is_empty() {
                    return Err(Error::validation(
                        "usage: set-subject <n> <subject> <marks>",
                    ));
                }
                Self::SetSubject {
                    index: parse_row(row)?,
                    subject: subject.join(" "),
                    marks: (*marks).to_string(),
                }
            }
            "remove-subject" => Self::RemoveSubject(parse_row(rest)?),
            "submit" => Self::Submit,
            "select" if !rest.is_empty() => Self::Select(rest.to_string()),
            "select" => return Err(Error::validation("usage: select <user>")),
            "back" => Self::Back,
            "feedback" => Self::Feedback(rest.to_string()),
            "show" => Self::Show,
            "quit" | "exit" => Self::Quit,
            other => {
                return Err(Error::validation(format!(
                    "unknown command '{other}', type 'help' for a list"
                )))
            }
        };
        Ok(command)
    }
}

fn parse_row(s: &str) -> Result<usize> {
    match s.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(Error::validation(format!(
            "'{s}' is not a row number (rows start at 1)"
        ))),
    }
}

/// An interactive session over a reader and a writer.
#[derive(Debug)]
pub struct Console<'a, R, W> {
    services: &'a Services,
    state: NavigationState,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Console<'a, R, W> {
    /// Start a fresh session.
    pub fn new(services: &'a Services, input: R, output: W) -> Self {
        Self {
            services,
            state: NavigationState::new(),
            input,
            output,
        }
    }

    /// The session's navigation state.
    #[must_use]
    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    /// Consume the console, returning its writer.
    pub fn into_output(self) -> W {
        self.output
    }

    /// Run until `quit` or end of input.
    ///
    /// Mistyped commands and refused actions are reported and the session
    /// carries on.
    ///
    /// # Errors
    ///
    /// Returns storage and I/O errors.
    pub fn run(&mut self) -> Result<()> {
        info!("Session started");
        self.render()?;

        loop {
            write!(self.output, "[{}]> ", self.state.screen())?;
            self.output.flush()?;

            let Some(line) = self.read_line()? else {
                writeln!(self.output)?;
                break;
            };

            let command = match Command::parse(&line) {
                Ok(command) => command,
                Err(e) => {
                    writeln!(self.output, "{e}")?;
                    continue;
                }
            };
            if command == Command::Quit {
                break;
            }
            self.execute(command)?;
        }

        info!("Session ended");
        Ok(())
    }

    /// Carry out one command.
    ///
    /// # Errors
    ///
    /// Returns storage and I/O errors.
    pub fn execute(&mut self, command: Command) -> Result<()> {
        debug!("Console command {:?}", command);
        match command {
            Command::Empty | Command::Quit => Ok(()),
            Command::Help => {
                writeln!(self.output, "{HELP}")?;
                Ok(())
            }
            Command::Show => self.render(),
            Command::Home => self.dispatch(Action::GoTo(Screen::Home)),
            Command::GoTo(screen) => self.dispatch(Action::GoTo(screen)),
            Command::Logout => self.dispatch(Action::Logout),
            Command::Signup => {
                self.dispatch(Action::GoTo(Screen::SignUp))?;
                let Some((username, password, role)) = self.prompt_credentials()? else {
                    return Ok(());
                };
                self.dispatch(Action::Signup {
                    username,
                    password,
                    role,
                })
            }
            Command::Login => {
                self.dispatch(Action::GoTo(Screen::Login))?;
                let Some((username, password, role)) = self.prompt_credentials()? else {
                    return Ok(());
                };
                self.dispatch(Action::Login {
                    username,
                    password,
                    role,
                })
            }
            Command::AddSubject => self.dispatch(Action::AddDraftSubject),
            Command::SetSubject {
                index,
                subject,
                marks,
            } => self.dispatch(Action::EditDraftSubject {
                index,
                subject,
                marks,
            }),
            Command::RemoveSubject(index) => self.dispatch(Action::RemoveDraftSubject(index)),
            Command::Submit => {
                let form = if self.state.screen() == Screen::Student {
                    self.prompt_profile()?
                } else {
                    ProfileForm::default()
                };
                self.dispatch(Action::SubmitProfile(form))
            }
            Command::Select(username) => self.dispatch(Action::SelectStudent(username)),
            Command::Back => self.dispatch(Action::DeselectStudent),
            Command::Feedback(text) => self.dispatch(Action::SubmitFeedback(text)),
        }
    }

    fn dispatch(&mut self, action: Action) -> Result<()> {
        match transition(&mut self.state, action, self.services) {
            Ok(Outcome::Moved(_) | Outcome::Stayed) => self.render(),
            Ok(Outcome::Notice(message)) => {
                writeln!(self.output, "{message}")?;
                Ok(())
            }
            Ok(Outcome::Warning(message)) => {
                writeln!(self.output, "warning: {message}")?;
                Ok(())
            }
            Err(e @ Error::InvalidTransition { .. }) => {
                writeln!(self.output, "{e}")?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn prompt(&mut self, label: &str) -> Result<String> {
        write!(self.output, "{label}: ")?;
        self.output.flush()?;
        Ok(self.read_line()?.unwrap_or_default())
    }

    fn prompt_credentials(&mut self) -> Result<Option<(String, String, Role)>> {
        let username = self.prompt("Username")?.trim().to_string();
        let password = self.prompt("Password")?;
        let role = self.prompt("Role (Mentor/Student)")?;
        match role.parse::<Role>() {
            Ok(role) => Ok(Some((username, password, role))),
            Err(e) => {
                writeln!(self.output, "warning: {e}")?;
                Ok(None)
            }
        }
    }

    fn prompt_profile(&mut self) -> Result<ProfileForm> {
        Ok(ProfileForm {
            name: self.prompt("Name")?,
            roll_no: self.prompt("Roll No")?,
            phone: self.prompt("Phone Number")?,
            certifications: self.prompt("Certifications")?,
            projects: self.prompt("Projects")?,
            academic_issues: self.prompt("Academic Issues")?,
        })
    }

    /// Draw the current screen.
    ///
    /// # Errors
    ///
    /// Returns storage and I/O errors.
    pub fn render(&mut self) -> Result<()> {
        match self.state.screen() {
            Screen::Home => {
                writeln!(self.output, "== MentorLink ==")?;
                writeln!(self.output, "Mentors and students, in one place.")?;
                writeln!(self.output, "Type 'signup' or 'login' to begin, 'help' for commands.")?;
            }
            Screen::SignUp => writeln!(self.output, "== Sign Up ==")?,
            Screen::Login => writeln!(self.output, "== Login ==")?,
            Screen::Student => self.render_student()?,
            Screen::Mentor => self.render_mentor()?,
        }
        Ok(())
    }

    fn render_student(&mut self) -> Result<()> {
        let username = self.state.current_username().to_string();
        writeln!(self.output, "== Student Details: {username} ==")?;

        writeln!(self.output, "Test marks:")?;
        if self.state.draft_subjects().is_empty() {
            writeln!(self.output, "  (no rows, use add-subject)")?;
        }
        for (i, draft) in self.state.draft_subjects().iter().enumerate() {
            writeln!(
                self.output,
                "  {}. subject: {:<20} marks: {}",
                i + 1,
                draft.subject,
                draft.marks
            )?;
        }

        match self.services.feedback.get_for_student(&username)? {
            Some(feedback) => writeln!(self.output, "Mentor feedback: {feedback}")?,
            None => writeln!(self.output, "No feedback from your mentor yet.")?,
        }
        Ok(())
    }

    fn render_mentor(&mut self) -> Result<()> {
        match self.state.mentor_view() {
            Some(MentorView::ViewingStudent(student)) => {
                let student = student.to_string();
                self.render_student_record(&student)
            }
            _ => {
                writeln!(self.output, "== Students ==")?;
                let students = self.services.profiles.list_students()?;
                if students.is_empty() {
                    writeln!(self.output, "No student has submitted details yet.")?;
                }
                for student in students {
                    writeln!(self.output, "  {student}")?;
                }
                Ok(())
            }
        }
    }

    fn render_student_record(&mut self, student: &str) -> Result<()> {
        writeln!(self.output, "== {student} ==")?;
        if let Some(profile) = self.services.profiles.get_latest(student)? {
            writeln!(self.output, "Name:            {}", profile.name)?;
            writeln!(self.output, "Roll No:         {}", profile.roll_no)?;
            writeln!(self.output, "Phone:           {}", profile.phone)?;
            writeln!(self.output, "Test marks:")?;
            for (subject, marks) in &profile.test_marks {
                writeln!(self.output, "  {subject}: {marks}")?;
            }
            writeln!(self.output, "Certifications:  {}", profile.certifications)?;
            writeln!(self.output, "Projects:        {}", profile.projects)?;
            writeln!(self.output, "Academic issues: {}", profile.academic_issues)?;
        }
        match self.services.feedback.get_for_student(student)? {
            Some(feedback) => writeln!(self.output, "Feedback:        {feedback}")?,
            None => writeln!(self.output, "Feedback:        (none)")?,
        }
        Ok(())
    }
}
