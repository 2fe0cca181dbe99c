//! Classification prompt.

/// Fixed instruction set: categories, per-category fields, strict JSON.
pub fn system_prompt() -> &'static str {
    "You are an intelligent assistant for a B.Tech student. Analyze the following email from \
     the college's placement cell and classify it. Extract key information in a clean JSON format.\n\n\
     First, determine the \"email_type\". It can be one of the following:\n\
     - \"New Opportunity\": A new job or internship announcement.\n\
     - \"Test Schedule\": Information about an upcoming test, exam, or assessment.\n\
     - \"Selection List\": A list of students who have been shortlisted or selected.\n\
     - \"Tech Talk\": An announcement for a webinar, seminar, or tech talk.\n\
     - \"General Notification\": Any other administrative message (e.g., 'fill this form', 'update your profile').\n\
     - \"Other\": If it doesn't fit any of the above.\n\n\
     Based on the type, extract the following details. If a field is not present, use null.\n\n\
     1. If \"email_type\" is \"New Opportunity\":\n\
        - \"company_name\": string\n\
        - \"job_role\": string\n\
        - \"ctc_or_stipend\": string\n\
        - \"application_deadline\": string (in \"YYYY-MM-DD\" format)\n\
        - \"interview_or_test_date\": string (in \"YYYY-MM-DD\" format. Extract any mentioned dates for tests, interviews, or company visits)\n\
        - \"eligibility_criteria\": string\n\n\
     2. If \"email_type\" is \"Test Schedule\":\n\
        - \"company_name\": string\n\
        - \"job_role\": string (if mentioned)\n\
        - \"test_date_time\": string (in ISO 8601 format, e.g., \"2025-04-05T15:00:00\")\n\
        - \"test_duration\": string (e.g., \"30 minutes\")\n\
        - \"test_location_or_mode\": string (e.g., \"Virtual\", \"PRP 713\")\n\n\
     3. If \"email_type\" is \"Selection List\":\n\
        - \"company_name\": string\n\
        - \"round_name\": string (e.g., \"Interview Shortlist\", \"Final Selection\")\n\n\
     4. If \"email_type\" is \"Tech Talk\":\n\
        - \"topic\": string\n\
        - \"speaker_or_company\": string\n\
        - \"date_time\": string (in ISO 8601 format)\n\
        - \"venue\": string\n\n\
     Respond with ONLY the JSON object. Do not add any explanation outside of it."
}

/// The email itself, fenced so the model can tell it apart from instructions.
pub fn user_prompt(body: &str) -> String {
    format!("Here is the email text:\n---\n{body}\n---")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_prompt_names_every_category() {
        let prompt = system_prompt();
        for label in [
            "New Opportunity",
            "Test Schedule",
            "Selection List",
            "Tech Talk",
            "General Notification",
            "\"Other\"",
        ] {
            assert!(prompt.contains(label), "missing {label}");
        }
        assert!(prompt.contains("ctc_or_stipend"));
        assert!(prompt.contains("test_location_or_mode"));
    }

    #[test]
    fn user_prompt_wraps_body() {
        let prompt = user_prompt("Acme is hiring");
        assert!(prompt.ends_with("---\nAcme is hiring\n---"));
    }
}
