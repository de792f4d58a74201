// routes/home.rs
// GET / -> login page posting JSON to /login.

use axum::response::Html;

pub async fn home() -> Html<&'static str> {
    Html(r#"<!DOCTYPE html>
<html lang="uk">
<head>
  <meta charset="utf-8">
  <title>SpaceHub</title>
</head>
<body>
  <main>
    <form id="login-form">
      <label>
        Email
        <input id="email" name="email" type="email" required>
      </label>
      <label>
        Код
        <input id="code" name="code" inputmode="numeric" pattern="\d*" required>
      </label>
      <button type="submit">Увійти</button>
    </form>
    <pre id="result"></pre>
  </main>
  <script>
    const form = document.getElementById('login-form');
    const result = document.getElementById('result');

    form.addEventListener('submit', async (event) => {
      event.preventDefault();
      const body = {
        email: form.email.value.trim(),
        code: form.code.value.trim()
      };

      try {
        const response = await fetch('/login', {
          method: 'POST',
          headers: { 'Content-Type': 'application/json' },
          body: JSON.stringify(body)
        });
        if (response.ok) {
          window.location.href = '/admin/companies';
          return;
        }
        result.textContent = await response.text();
      } catch (err) {
        result.textContent = 'Помилка входу';
      }
    });
  </script>
</body>
</html>
"#)
}
