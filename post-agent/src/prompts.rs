//! Prompt text sent to the content generator.

use daypost_core::{CategoryConfig, CompanyProfile};

const SINGLE_POST_RULES: &str = "Keep the post under 200 words and include relevant emojis. \
IMPORTANT: Generate only ONE post, not multiple numbered posts. \
Do not use numbers like '1)', '2)', '3)' in your response.";

pub fn company_context(company: &CompanyProfile) -> String {
    format!(
        "Company: {}\nLocation: {}\nServices: {}\nTarget Audience: {}\nBrand Voice: {}\n\n{}",
        company.name,
        company.location,
        company.services.join(", "),
        company.target_audience.join(", "),
        company.brand_voice,
        company.content_guidelines,
    )
}

pub fn category_system(company: &CompanyProfile) -> String {
    format!(
        "You are an expert social media manager for {}. Generate ONE SINGLE engaging, \
         authentic post that showcases web design expertise while being helpful to the \
         local business community in {}. {}",
        company.name, company.location, SINGLE_POST_RULES
    )
}

pub fn category_prompt(company: &CompanyProfile, category: &CategoryConfig) -> String {
    let readable = category.name.replace('_', " ");
    format!(
        "{}\n\nGenerate a {} post that is engaging, authentic, and relevant to local businesses \
         in {}.\n\n{}",
        company_context(company),
        readable,
        company.location,
        category.description
    )
}

pub fn holiday_system(company: &CompanyProfile, holiday_name: &str) -> String {
    format!(
        "You are an expert social media manager for {name}. Today is {holiday}. Generate ONE \
         SINGLE engaging, authentic holiday post that celebrates {holiday} while being relevant \
         to web design and local businesses in {location}. {rules}",
        name = company.name,
        holiday = holiday_name,
        location = company.location,
        rules = SINGLE_POST_RULES
    )
}

pub fn holiday_prompt(company: &CompanyProfile, holiday_name: &str) -> String {
    format!(
        "{context}\n\nToday is {holiday}. Generate a holiday-themed post that celebrates this \
         special day while being relevant to web design and local businesses.\n\n\
         Celebrate {holiday} with a post that honors the significance of this holiday while \
         connecting it to web design and local business success.",
        context = company_context(company),
        holiday = holiday_name
    )
}

pub const IMAGE_PROMPT_SYSTEM: &str = "You write prompts for an image generation model. \
Reply with the improved prompt only, without quotes or commentary. \
The image must not contain any text, words or letters.";

pub fn enhance_image_prompt(base_prompt: &str, post_content: &str) -> String {
    format!(
        "Improve this image prompt so the image matches the social media post below. \
         Keep it under 120 words.\n\nPrompt: {}\n\nPost:\n{}",
        base_prompt, post_content
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use daypost_core::AppConfig;

    #[test]
    fn test_category_prompt_includes_context_and_description() {
        let config = AppConfig::default();
        let category = config.category("seo_tips").unwrap();
        let prompt = category_prompt(&config.company, category);

        assert!(prompt.starts_with("Company: Fishtown Web Design"));
        assert!(prompt.contains("Generate a seo tips post"));
        assert!(prompt.contains(&category.description));
        assert!(prompt.contains("fully remote company"));
    }

    #[test]
    fn test_holiday_texts_name_the_holiday() {
        let company = CompanyProfile::default();
        assert!(holiday_system(&company, "Labor Day").contains("Today is Labor Day."));
        assert!(holiday_prompt(&company, "Labor Day").contains("Celebrate Labor Day"));
        assert!(category_system(&company).contains("ONE SINGLE"));
    }
}
