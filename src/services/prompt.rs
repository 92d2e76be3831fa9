// Prompt templates, crisis detection, and risk-based guidance for the AI therapist.

use crate::models::chat::AiChatMessage;
use crate::services::assessment_store::AssessmentProgress;
use crate::services::scoring::RiskLevel;
use serde::Serialize;

const CRISIS_KEYWORDS: [&str; 12] = [
    "suicide",
    "kill myself",
    "end it all",
    "not worth living",
    "hurt myself",
    "self harm",
    "cut myself",
    "overdose",
    "jump off",
    "hang myself",
    "end my life",
    "better off dead",
];

const PROXY_SYSTEM_PROMPT: &str = "You are HopeLine mental health assistant. Be supportive and VERY concise (max 2-3 sentences). Provide general wellbeing guidance, not medical diagnosis. If crisis is suspected, advise calling local helplines.";

const FALLBACK_EN: &str = "The assistant is busy right now. I'm here to listen. If this is urgent, please use Crisis Alert or call a local helpline.";
const FALLBACK_HI: &str = "सहायक अभी व्यस्त है। मैं सुन रहा/रही हूँ। यदि यह आपातकाल है, कृपया Crisis Alert का उपयोग करें।";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidanceAction {
    CrisisIntervention,
    CounselorReferral,
    SelfHelpGuidance,
    GeneralSupport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Guidance {
    pub message: String,
    pub action: GuidanceAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counselor_contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<&'static str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub immediate_action: bool,
}

#[derive(Debug, Clone)]
pub struct PromptSystem {
    counselor_contact: String,
}

impl PromptSystem {
    pub fn new(counselor_contact: impl Into<String>) -> Self {
        Self {
            counselor_contact: counselor_contact.into(),
        }
    }

    /// Full instructions for the AI therapist persona.
    pub fn system_prompt(&self) -> String {
        format!(
            r#"You are an AI Therapist chatbot built for the project "Development of a Digital Mental Health and Psychological Support System for Students in Higher Education."

Your purpose is to support students who may face stress, anxiety, depression, academic pressure, loneliness, or other psychological issues.

CORE BEHAVIOR:
- Keep replies short, empathetic, and supportive (2-4 sentences max)
- Avoid judgment and clinical jargon unless necessary
- Always give next steps instead of long lectures
- Be warm, understanding, and non-judgmental
- Use "I" statements and show genuine care

CONVERSATION RULES:
- Do not repeat the same question or sentence in back-to-back messages.
- Build on the student's last message; acknowledge briefly, then progress.
- If you already asked something, either rephrase once or move forward.

ASSESSMENT FLOW (PHQ-9 & GAD-7):
1. Greet the student and explain you'll ask a few short questions to understand their mental health better
2. Administer PHQ-9 (9 items) and GAD-7 (7 items), one question at a time
3. Response scale: 0 = Not at all, 1 = Several days, 2 = More than half the days, 3 = Nearly every day
4. Collect responses and calculate total scores

PHQ-9 SEVERITY:
- 0-4 -> Minimal
- 5-9 -> Mild
- 10-14 -> Moderate
- 15-19 -> Moderately Severe
- 20-27 -> Severe

GAD-7 SEVERITY:
- 0-4 -> Minimal
- 5-9 -> Mild
- 10-14 -> Moderate
- 15-21 -> Severe

RISK CATEGORIZATION & ACTIONS:

LOW RISK (minimal/mild):
-> Suggest self-help tips (breathing, journaling, peer support, time management)

MODERATE RISK (moderate levels):
-> Suggest peer support, counselor booking, and follow-up check-ins

HIGH RISK (moderately severe or severe; mentions of self-harm, suicidal thoughts, crisis):
-> Show immediate empathy
-> Escalate to a human counselor with contact details: {contact}
-> Keep the student calm and engaged until counselor takes over

BOUNDARIES:
- Do not prescribe medication
- Never dismiss feelings
- Always prioritize confidentiality and safety
- If crisis detected, immediately provide helpline numbers
- Maintain professional boundaries while being supportive

Remember: You are here to support, not diagnose. Always encourage professional help when needed."#,
            contact = self.counselor_contact
        )
    }

    /// Flattens a conversation into the single-turn prompt sent to the LLM proxy.
    pub fn proxy_prompt(&self, messages: &[AiChatMessage], lang: &str) -> String {
        let conversation = messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "{}\nLanguage: {}\nConversation:\n{}\nassistant:",
            PROXY_SYSTEM_PROMPT, lang, conversation
        )
    }

    /// Supportive canned reply used when the LLM is unavailable.
    pub fn fallback_message(lang: &str) -> &'static str {
        match lang {
            "hi" => FALLBACK_HI,
            _ => FALLBACK_EN,
        }
    }

    pub fn detect_crisis_keywords(message: &str) -> bool {
        let lower = message.to_lowercase();
        CRISIS_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
    }

    pub fn crisis_response(&self) -> Guidance {
        Guidance {
            message: format!(
                "I'm really concerned about what you're telling me. Your life has value, and you are not alone. Please call {} right now for immediate support. I'm also connecting you with a crisis counselor. Please stay safe - there are people who care about you and want to help.",
                self.counselor_contact
            ),
            action: GuidanceAction::CrisisIntervention,
            counselor_contact: Some(self.counselor_contact.clone()),
            priority: Some("urgent"),
            suggestions: Vec::new(),
            immediate_action: true,
        }
    }

    pub fn risk_response(&self, risk: RiskLevel) -> Guidance {
        match risk {
            RiskLevel::High => Guidance {
                message: format!(
                    "I'm really concerned about your wellbeing. You are not alone, and I want to make sure you get the support you need right now. Please call {} for immediate professional support. I've also scheduled an offline counselor session for you. Your feelings are valid, and there are people who can help you through this.",
                    self.counselor_contact
                ),
                action: GuidanceAction::CrisisIntervention,
                counselor_contact: Some(self.counselor_contact.clone()),
                priority: Some("urgent"),
                suggestions: Vec::new(),
                immediate_action: false,
            },
            RiskLevel::Moderate => Guidance {
                message: "It seems you've been going through a challenging time lately. I recommend connecting with a peer support group or booking a counselor session. Would you like me to help you schedule a counseling appointment? There are also some self-help techniques we can explore together.".to_string(),
                action: GuidanceAction::CounselorReferral,
                counselor_contact: None,
                priority: None,
                suggestions: vec!["peer_support", "counselor_booking", "self_help_tips"],
                immediate_action: false,
            },
            RiskLevel::Low => Guidance {
                message: "It sounds like you might be experiencing some mild stress or anxiety. Let's try some simple techniques that can help. How about we start with a quick breathing exercise, or would you prefer to talk about what's on your mind?".to_string(),
                action: GuidanceAction::SelfHelpGuidance,
                counselor_contact: None,
                priority: None,
                suggestions: vec![
                    "breathing_exercises",
                    "time_management",
                    "peer_support",
                    "journaling",
                ],
                immediate_action: false,
            },
        }
    }

    pub fn self_help_suggestions(&self, risk: RiskLevel) -> Vec<String> {
        match risk {
            RiskLevel::Low => vec![
                "Try the 4-7-8 breathing technique: Inhale for 4, hold for 7, exhale for 8".to_string(),
                "Break large tasks into smaller, manageable steps".to_string(),
                "Take regular breaks and practice mindfulness".to_string(),
                "Connect with friends or join a study group".to_string(),
            ],
            RiskLevel::Moderate => vec![
                "Practice daily journaling to express your thoughts".to_string(),
                "Try progressive muscle relaxation exercises".to_string(),
                "Consider joining our peer support groups".to_string(),
                "Schedule regular check-ins with a counselor".to_string(),
            ],
            RiskLevel::High => vec![
                format!("Please call the helpline immediately: {}", self.counselor_contact),
                "Stay with a trusted friend or family member".to_string(),
                "Remove any means of self-harm from your environment".to_string(),
                "Remember: This feeling is temporary and help is available".to_string(),
            ],
        }
    }

    pub fn general_support(&self) -> Guidance {
        Guidance {
            message: "I'm here to listen and support you. How are you feeling today? If you'd like, I can help you with a quick mental health check-in.".to_string(),
            action: GuidanceAction::GeneralSupport,
            counselor_contact: None,
            priority: None,
            suggestions: vec!["start_assessment", "general_chat", "self_help_tips"],
            immediate_action: false,
        }
    }

    /// Crisis language in the latest message wins, then any stored assessment, then general support.
    pub fn conversation_context(
        &self,
        progress: Option<&AssessmentProgress>,
        messages: &[AiChatMessage],
    ) -> Guidance {
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        if Self::detect_crisis_keywords(last) {
            return self.crisis_response();
        }

        match progress {
            Some(progress) => self.risk_response(progress.overall_risk),
            None => self.general_support(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::scoring::{gad7_severity, phq9_severity};

    fn msg(role: &str, content: &str) -> AiChatMessage {
        AiChatMessage {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_crisis_keywords_case_insensitive() {
        assert!(PromptSystem::detect_crisis_keywords("Sometimes I think I'm Better Off Dead"));
        assert!(PromptSystem::detect_crisis_keywords("I want to END IT ALL"));
        assert!(!PromptSystem::detect_crisis_keywords("exams are stressing me out"));
    }

    #[test]
    fn test_proxy_prompt_layout() {
        let prompts = PromptSystem::new("+1-555-0100");
        let prompt = prompts.proxy_prompt(&[msg("user", "hi"), msg("assistant", "hello")], "en");
        assert!(prompt.starts_with("You are HopeLine mental health assistant."));
        assert!(prompt.contains("\nLanguage: en\nConversation:\nuser: hi\nassistant: hello\nassistant:"));
    }

    #[test]
    fn test_risk_responses_carry_contact_only_when_high() {
        let prompts = PromptSystem::new("+1-555-0100");
        let high = prompts.risk_response(RiskLevel::High);
        assert_eq!(high.action, GuidanceAction::CrisisIntervention);
        assert_eq!(high.counselor_contact.as_deref(), Some("+1-555-0100"));
        assert!(high.message.contains("+1-555-0100"));

        let moderate = prompts.risk_response(RiskLevel::Moderate);
        assert_eq!(moderate.action, GuidanceAction::CounselorReferral);
        assert!(moderate.counselor_contact.is_none());
        assert_eq!(moderate.suggestions, vec!["peer_support", "counselor_booking", "self_help_tips"]);

        let low = prompts.risk_response(RiskLevel::Low);
        assert_eq!(low.action, GuidanceAction::SelfHelpGuidance);
        assert_eq!(low.suggestions.len(), 4);
    }

    #[test]
    fn test_conversation_context_priority() {
        let prompts = PromptSystem::new("+1-555-0100");
        let progress = AssessmentProgress::new(Some(phq9_severity(3)), Some(gad7_severity(12)));

        let crisis = prompts.conversation_context(Some(&progress), &[msg("user", "I want to hurt myself")]);
        assert!(crisis.immediate_action);

        let referral = prompts.conversation_context(Some(&progress), &[msg("user", "hello")]);
        assert_eq!(referral.action, GuidanceAction::CounselorReferral);

        let general = prompts.conversation_context(None, &[]);
        assert_eq!(general.action, GuidanceAction::GeneralSupport);
    }

    #[test]
    fn test_fallback_language() {
        assert!(PromptSystem::fallback_message("en").starts_with("The assistant is busy"));
        assert!(PromptSystem::fallback_message("fr").starts_with("The assistant is busy"));
        assert_ne!(PromptSystem::fallback_message("hi"), PromptSystem::fallback_message("en"));
    }

    #[test]
    fn test_high_risk_suggestions_mention_helpline() {
        let prompts = PromptSystem::new("+1-555-0100");
        let tips = prompts.self_help_suggestions(RiskLevel::High);
        assert!(tips[0].ends_with("+1-555-0100"));
        assert_eq!(prompts.system_prompt().matches("+1-555-0100").count(), 1);
    }
}
