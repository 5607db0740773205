use serde::Serialize;

/// One outbound message addressed to every recipient at once
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundEmail {
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
}

impl OutboundEmail {
    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }
}

pub fn subject_for(internship_name: &str) -> String {
    format!("Opportunity: {}", internship_name)
}

pub fn body_for(internship_name: &str) -> String {
    format!(
        "Dear Student,\n\n\
         You are eligible for the internship: {}.\n\
         Please check your dashboard for more details.\n\n\
         Best,\nPlacement Cell",
        internship_name
    )
}

/// Build the announcement sent to eligible students
pub fn compose(internship_name: &str, recipients: Vec<String>) -> OutboundEmail {
    OutboundEmail {
        subject: subject_for(internship_name),
        body: body_for(internship_name),
        recipients,
    }
}
