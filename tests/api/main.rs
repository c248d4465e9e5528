mod books;
mod documents;
mod health_check;
mod news;
