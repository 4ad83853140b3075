//! Session navigation.
//!
//! A session's state lives in a [`NavigationState`] owned by that session.
//! It only changes through [`transition`], which applies one [`Action`],
//! calls into the services for anything that touches storage, and reports
//! what the user should see next as an [`Outcome`].
//!
//! The `Student` and `Mentor` screens are only reachable while
//! authenticated. Actions sent from a screen where they make no sense are
//! rejected with [`Error::InvalidTransition`] and leave the state as it was.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{FeedbackNote, Profile, Role};
use crate::services::Services;

/// Message shown for any refused login.
pub const LOGIN_FAILED: &str = "Incorrect Username/Password";

/// The screen a session is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Screen {
    /// Landing screen.
    #[default]
    Home,
    /// Account creation.
    SignUp,
    /// Login form.
    Login,
    /// Student details form and feedback.
    Student,
    /// Mentor student list and review.
    Mentor,
}

impl Screen {
    /// Whether the screen requires an authenticated session.
    #[must_use]
    pub fn is_protected(self) -> bool {
        matches!(self, Self::Student | Self::Mentor)
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Home => "Home",
            Self::SignUp => "SignUp",
            Self::Login => "Login",
            Self::Student => "Student",
            Self::Mentor => "Mentor",
        };
        f.write_str(name)
    }
}

impl FromStr for Screen {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" => Ok(Self::Home),
            "signup" | "sign-up" => Ok(Self::SignUp),
            "login" => Ok(Self::Login),
            "student" => Ok(Self::Student),
            "mentor" => Ok(Self::Mentor),
            other => Err(Error::validation(format!("unknown page '{other}'"))),
        }
    }
}

/// What a mentor is looking at on the `Mentor` screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentorView<'a> {
    /// Picking a student.
    ListingStudents,
    /// Reviewing one student.
    ViewingStudent(&'a str),
}

/// One editable subject/marks row of the student form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftSubject {
    /// Subject name.
    pub subject: String,
    /// Marks obtained.
    pub marks: String,
}

/// Free-text fields of the student details form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    /// Full name.
    pub name: String,
    /// Roll number.
    pub roll_no: String,
    /// Phone number.
    pub phone: String,
    /// Certifications.
    pub certifications: String,
    /// Projects.
    pub projects: String,
    /// Academic issues.
    pub academic_issues: String,
}

/// Per-session navigation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    screen: Screen,
    authenticated: bool,
    current_username: String,
    current_role: Option<Role>,
    selected_student: Option<String>,
    draft_subjects: Vec<DraftSubject>,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            screen: Screen::Home,
            authenticated: false,
            current_username: String::new(),
            current_role: None,
            selected_student: None,
            draft_subjects: vec![DraftSubject::default()],
        }
    }
}

impl NavigationState {
    /// A fresh session: on `Home`, logged out, one blank subject row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The active screen.
    #[must_use]
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Whether someone is logged in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Logged-in username, empty when logged out.
    #[must_use]
    pub fn current_username(&self) -> &str {
        &self.current_username
    }

    /// Session role, `None` when logged out.
    #[must_use]
    pub fn current_role(&self) -> Option<Role> {
        self.current_role
    }

    /// Student a mentor is reviewing.
    #[must_use]
    pub fn selected_student(&self) -> Option<&str> {
        self.selected_student.as_deref()
    }

    /// Subject rows of the student form.
    #[must_use]
    pub fn draft_subjects(&self) -> &[DraftSubject] {
        &self.draft_subjects
    }

    /// The mentor sub-mode, when on the `Mentor` screen.
    #[must_use]
    pub fn mentor_view(&self) -> Option<MentorView<'_>> {
        if self.screen != Screen::Mentor {
            return None;
        }
        Some(match self.selected_student.as_deref() {
            Some(student) => MentorView::ViewingStudent(student),
            None => MentorView::ListingStudents,
        })
    }

    /// Protected screens are only ever active while authenticated.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        !self.screen.is_protected() || self.authenticated
    }

    fn reject(&self, action: &Action) -> Error {
        Error::InvalidTransition {
            action: action.name(),
            screen: self.screen.to_string(),
        }
    }

    fn require_student_screen(&self, action: &Action) -> Result<()> {
        if self.authenticated && self.screen == Screen::Student {
            Ok(())
        } else {
            Err(self.reject(action))
        }
    }

    fn require_mentor_screen(&self, action: &Action) -> Result<()> {
        if self.authenticated
            && self.screen == Screen::Mentor
            && self.current_role == Some(Role::Mentor)
        {
            Ok(())
        } else {
            Err(self.reject(action))
        }
    }

    fn clear_session(&mut self) {
        self.authenticated = false;
        self.current_username.clear();
        self.current_role = None;
        self.selected_student = None;
        self.draft_subjects = vec![DraftSubject::default()];
    }

    /// Marks from the draft rows, skipping rows with a blank subject or mark.
    fn collect_marks(&self) -> BTreeMap<String, String> {
        self.draft_subjects
            .iter()
            .map(|d| (d.subject.trim(), d.marks.trim()))
            .filter(|(subject, marks)| !subject.is_empty() && !marks.is_empty())
            .map(|(subject, marks)| (subject.to_string(), marks.to_string()))
            .collect()
    }
}

/// Something the user asked the session to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Switch screen.
    GoTo(Screen),
    /// Create an account.
    Signup {
        /// Username to register.
        username: String,
        /// Plaintext password; only its digest is stored.
        password: String,
        /// Role to register as.
        role: Role,
    },
    /// Log in.
    Login {
        /// Username.
        username: String,
        /// Plaintext password.
        password: String,
        /// Role to run the session as.
        role: Role,
    },
    /// Log out and return home.
    Logout,
    /// Mentor: open a student's record.
    SelectStudent(String),
    /// Mentor: go back to the student list.
    DeselectStudent,
    /// Student: add a blank subject row.
    AddDraftSubject,
    /// Student: fill in a subject row.
    EditDraftSubject {
        /// Row to edit.
        index: usize,
        /// Subject name.
        subject: String,
        /// Marks obtained.
        marks: String,
    },
    /// Student: drop a subject row.
    RemoveDraftSubject(usize),
    /// Student: store the form.
    SubmitProfile(ProfileForm),
    /// Mentor: store a note about the selected student.
    SubmitFeedback(String),
}

impl Action {
    /// Short name used in logs and errors.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::GoTo(_) => "goto",
            Self::Signup { .. } => "signup",
            Self::Login { .. } => "login",
            Self::Logout => "logout",
            Self::SelectStudent(_) => "select_student",
            Self::DeselectStudent => "deselect_student",
            Self::AddDraftSubject => "add_draft_subject",
            Self::EditDraftSubject { .. } => "edit_draft_subject",
            Self::RemoveDraftSubject(_) => "remove_draft_subject",
            Self::SubmitProfile(_) => "submit_profile",
            Self::SubmitFeedback(_) => "submit_feedback",
        }
    }
}

/// What the user should be told after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The session moved to this screen.
    Moved(Screen),
    /// The screen did not change.
    Stayed,
    /// Success message.
    Notice(String),
    /// The action was refused; the state is unchanged.
    Warning(String),
}

/// Apply `action` to `state`.
///
/// User mistakes (bad credentials, taken or blank usernames, unknown
/// students) come back as [`Outcome::Warning`] with the state untouched.
///
/// # Errors
///
/// Returns [`Error::InvalidTransition`] when the action is not allowed on
/// the current screen, or a storage error from the services.
pub fn transition(
    state: &mut NavigationState,
    action: Action,
    services: &Services,
) -> Result<Outcome> {
    debug!("{} on {} screen", action.name(), state.screen);

    let outcome = match action {
        Action::GoTo(screen) => {
            if screen.is_protected() && !state.authenticated {
                return Err(state.reject(&action));
            }
            state.screen = screen;
            Outcome::Moved(screen)
        }

        Action::Signup {
            username,
            password,
            role,
        } => match services.accounts.signup(&username, &password, role) {
            Ok(_) => Outcome::Notice(
                "You have successfully created an account. Go to Login to sign in.".to_string(),
            ),
            Err(e) if e.is_user_error() => Outcome::Warning(e.to_string()),
            Err(e) => return Err(e),
        },

        Action::Login {
            username,
            password,
            role,
        } => match services.accounts.login(&username, &password, role) {
            Ok(auth) => {
                let screen = match auth.role {
                    Role::Student => Screen::Student,
                    Role::Mentor => Screen::Mentor,
                };
                state.authenticated = true;
                state.current_username = auth.account.username;
                state.current_role = Some(auth.role);
                state.selected_student = None;
                state.screen = screen;
                Outcome::Moved(screen)
            }
            Err(Error::Auth(_)) => Outcome::Warning(LOGIN_FAILED.to_string()),
            Err(e) => return Err(e),
        },

        Action::Logout => {
            state.clear_session();
            state.screen = Screen::Home;
            Outcome::Moved(Screen::Home)
        }

        Action::SelectStudent(ref username) => {
            state.require_mentor_screen(&action)?;
            if state.selected_student.is_some() {
                return Err(state.reject(&action));
            }
            if services.profiles.get_latest(username)?.is_none() {
                return Ok(Outcome::Warning(format!(
                    "{username} has not submitted any details"
                )));
            }
            state.selected_student = Some(username.clone());
            Outcome::Stayed
        }

        Action::DeselectStudent => {
            state.require_mentor_screen(&action)?;
            state.selected_student = None;
            Outcome::Stayed
        }

        Action::AddDraftSubject => {
            state.require_student_screen(&action)?;
            state.draft_subjects.push(DraftSubject::default());
            Outcome::Stayed
        }

        Action::EditDraftSubject {
            index,
            ref subject,
            ref marks,
        } => {
            state.require_student_screen(&action)?;
            if let Some(draft) = state.draft_subjects.get_mut(index) {
                draft.subject.clone_from(subject);
                draft.marks.clone_from(marks);
            }
            Outcome::Stayed
        }

        Action::RemoveDraftSubject(index) => {
            state.require_student_screen(&action)?;
            if index < state.draft_subjects.len() {
                state.draft_subjects.remove(index);
            }
            Outcome::Stayed
        }

        Action::SubmitProfile(ref form) => {
            state.require_student_screen(&action)?;
            let profile = Profile {
                username: state.current_username.clone(),
                name: form.name.clone(),
                roll_no: form.roll_no.clone(),
                phone: form.phone.clone(),
                test_marks: state.collect_marks(),
                certifications: form.certifications.clone(),
                projects: form.projects.clone(),
                academic_issues: form.academic_issues.clone(),
            };
            services.profiles.submit(&profile)?;
            Outcome::Notice("Details Submitted".to_string())
        }

        Action::SubmitFeedback(ref feedback) => {
            state.require_mentor_screen(&action)?;
            let Some(student) = state.selected_student.clone() else {
                return Err(state.reject(&action));
            };
            services.feedback.submit(&FeedbackNote {
                mentor_username: state.current_username.clone(),
                student_username: student,
                feedback: feedback.clone(),
            })?;
            Outcome::Notice("Feedback submitted".to_string())
        }
    };

    debug_assert!(state.is_consistent());
    Ok(outcome)
}
