#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use blueprint_adapters::{GatewayError, GatewayResult, ModelCaller, ModelRequest};

/// Which phase issued a request, judged from its system prompt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    Architect,
    Executor,
    Accuracy,
    Style,
    Judge,
    Analysis,
    Generation,
}

pub fn role(request: &ModelRequest) -> Role {
    let Some(system) = request.system_prompt.as_deref() else {
        return Role::Executor;
    };
    if system.contains("expanded_prompt_text") {
        Role::Architect
    } else if system.contains("focused on accuracy") {
        Role::Accuracy
    } else if system.contains("style and readability") {
        Role::Style
    } else if system.contains("impartial evaluator") {
        Role::Judge
    } else if system.contains("structured Prompt Spec") {
        Role::Analysis
    } else {
        Role::Generation
    }
}

type Responder = Box<dyn Fn(Role, &ModelRequest) -> GatewayResult<String> + Send + Sync>;

/// Fake model that answers from a closure and records every request.
pub struct ScriptedCaller {
    responder: Responder,
    log: Mutex<Vec<(Role, ModelRequest)>>,
}

impl ScriptedCaller {
    pub fn new(
        responder: impl Fn(Role, &ModelRequest) -> GatewayResult<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(Role, ModelRequest)> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, wanted: Role) -> usize {
        self.log.lock().unwrap().iter().filter(|(r, _)| *r == wanted).count()
    }
}

#[async_trait]
impl ModelCaller for ScriptedCaller {
    async fn call(&self, request: ModelRequest) -> GatewayResult<String> {
        let role = role(&request);
        let reply = (self.responder)(role, &request);
        self.log.lock().unwrap().push((role, request));
        reply
    }
}

pub fn architect_reply(text: &str) -> String {
    serde_json::json!({
        "analysis": {"detected_domain": "general", "input_quality_score": 6, "is_vague_or_short": true},
        "reverse_prompting": {"was_triggered": false, "refined_task_text": "", "reasoning": ""},
        "final_output": {"expanded_prompt_text": text, "enrichment_attributes_used": []}
    })
    .to_string()
}

pub fn judge_reply(score: f64, summary: &str) -> String {
    serde_json::json!({
        "dimensions": {
            "instructionAdherence": score,
            "taskQuality": score,
            "structureFormat": score,
            "toneAudience": score
        },
        "justifications": {
            "instructionAdherence": format!("{summary} adherence"),
            "taskQuality": format!("{summary} quality"),
            "structureFormat": format!("{summary} structure"),
            "toneAudience": format!("{summary} tone")
        },
        "summary": summary
    })
    .to_string()
}

pub fn unavailable() -> GatewayError {
    GatewayError::from_status(blueprint_adapters::Provider::Gemini, 503, "overloaded")
}
