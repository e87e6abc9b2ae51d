pub mod clean;
pub mod ids;
pub mod newsapi;
pub mod types;

use types::{ArticleDetail, NewsArticle};

impl From<NewsArticle> for ArticleDetail {
    fn from(article: NewsArticle) -> Self {
        let clean_content = clean::clean_news_content(Some(&article.content));
        let content_html = clean::clean_news_html(Some(&article.content));
        let published_label = article.published_at.as_ref().map(crate::utils::format_news_date);

        Self {
            article,
            clean_content,
            content_html,
            published_label,
        }
    }
}
