use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ServiceOffering {
    pub name: String,
    #[serde(default)]
    pub price_min: Option<u32>,
    #[serde(default)]
    pub price_max: Option<u32>,
    #[serde(default)]
    pub urgency: Option<String>,
}

impl ServiceOffering {
    fn new(name: &str, price_min: u32, price_max: u32, urgency: &str) -> Self {
        Self {
            name: name.to_string(),
            price_min: Some(price_min),
            price_max: Some(price_max),
            urgency: Some(urgency.to_string()),
        }
    }
}

/// Catalogue offered when a business has not listed its own services.
pub fn default_services() -> Vec<ServiceOffering> {
    vec![
        ServiceOffering::new("Emergency Pumping", 400, 600, "Emergency"),
        ServiceOffering::new("Routine Pumping", 250, 400, "Flexible"),
        ServiceOffering::new("Septic Inspection", 150, 250, "Same Day"),
        ServiceOffering::new("Drain Field Repair", 800, 1500, "Emergency"),
        ServiceOffering::new("System Installation", 3000, 8000, "Flexible"),
    ]
}

/// What the agent needs to know about the business it answers for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusinessProfile {
    pub business_name: String,
    pub industry: Option<String>,
    pub services: Vec<ServiceOffering>,
    pub pricing: Option<String>,
    pub special_instructions: Option<String>,
}

impl BusinessProfile {
    fn industry(&self) -> &str {
        self.industry.as_deref().unwrap_or("septic service")
    }
}

fn service_line(service: &ServiceOffering) -> String {
    let price = match (service.price_min, service.price_max) {
        (Some(min), Some(max)) => format!(": ${min}-${max}"),
        (Some(min), None) => format!(": from ${min}"),
        (None, Some(max)) => format!(": up to ${max}"),
        (None, None) => String::new(),
    };
    let urgency = service
        .urgency
        .as_ref()
        .map(|u| format!(" ({u} priority)"))
        .unwrap_or_default();
    format!("- {}{price}{urgency}", service.name)
}

pub fn first_message(profile: &BusinessProfile) -> String {
    format!(
        "Thank you for calling {}. How can I help you today?",
        profile.business_name
    )
}

/// Natural-language instructions submitted to the vendor as the agent's prompt.
pub fn build_agent_prompt(profile: &BusinessProfile) -> String {
    let services = if profile.services.is_empty() {
        default_services()
    } else {
        profile.services.clone()
    };
    let services_list: Vec<String> = services.iter().map(service_line).collect();
    let name = &profile.business_name;

    let mut prompt = format!(
        "You are a friendly and professional phone receptionist for {name}, a {industry} company.

Your job is to:
1. Greet callers warmly
2. Understand what service they need
3. Assess the urgency
4. Collect their name, phone number, property address, and a brief description of the issue
5. Book an appointment by offering 2-3 time slots
6. Confirm all details before ending the call

Greeting: \"{greeting}\"

SERVICES:
{services}

IMPORTANT:
- Be empathetic for emergencies; raw sewage backing up is always an emergency
- Never make up pricing; say \"Our technician will provide a quote on-site\"
- Keep calls under 3 minutes
- If unsure: \"Let me have our manager call you back\"",
        industry = profile.industry(),
        greeting = first_message(profile),
        services = services_list.join("\n"),
    );

    if let Some(pricing) = profile.pricing.as_deref().filter(|p| !p.trim().is_empty()) {
        prompt.push_str(&format!("\n\nPRICING NOTES:\n{}", pricing.trim()));
    }
    prompt.push_str("\n\nAlways add: \"Final price depends on your specific situation.\"");
    if let Some(extra) = profile
        .special_instructions
        .as_deref()
        .filter(|s| !s.trim().is_empty())
    {
        prompt.push_str(&format!("\n\nSPECIAL INSTRUCTIONS:\n{}", extra.trim()));
    }
    prompt
}
